pub mod inmem;
pub mod ws;

use crate::errors::ClientError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Frame delivered by a transport to the connection actor
#[derive(Debug)]
pub enum TransportFrame {
	Text(String),
	/// Transport-level close, clean or not. The actor decides whether it
	/// was expected.
	Closed { reason: Option<String> },
}

/// One live connection. Dropping the link tears the transport down; the
/// pump tasks exit when their channel ends close.
pub struct TransportLink {
	pub sender: mpsc::Sender<String>,
	pub receiver: mpsc::Receiver<TransportFrame>,
}

/// Dial-side abstraction injected into the connection manager.
///
/// The real implementation speaks WebSocket via tungstenite; the in-memory
/// one backs tests and single-process wiring with plain channels.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	async fn connect(&self, endpoint: &str) -> Result<TransportLink, ClientError>;
}
