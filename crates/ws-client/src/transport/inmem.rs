use super::{Transport, TransportFrame, TransportLink};
use crate::errors::ClientError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use ws_messages::Envelope;

const CHANNEL_CAPACITY: usize = 64;

/// In-memory transport: each `connect` yields a channel pair whose server
/// end is handed to whoever holds the accept receiver. Suitable for tests
/// and single-process wiring; failure injection covers reconnect paths.
pub struct InMemTransport {
	accept_tx: mpsc::Sender<ServerEnd>,
	failures_remaining: AtomicUsize,
}

/// The peer half of an in-memory connection, driven by a test harness or a
/// local server task.
pub struct ServerEnd {
	pub from_client: mpsc::Receiver<String>,
	pub to_client: mpsc::Sender<TransportFrame>,
}

impl InMemTransport {
	/// Create the transport plus the accept stream of server ends, one per
	/// successful `connect`.
	#[must_use]
	pub fn new() -> (Arc<Self>, mpsc::Receiver<ServerEnd>) {
		let (accept_tx, accept_rx) = mpsc::channel(CHANNEL_CAPACITY);
		(
			Arc::new(Self {
				accept_tx,
				failures_remaining: AtomicUsize::new(0),
			}),
			accept_rx,
		)
	}

	/// Make the next `count` connect calls fail with a network error
	pub fn fail_next(&self, count: usize) {
		self.failures_remaining.store(count, Ordering::SeqCst);
	}

	fn take_failure(&self) -> bool {
		self
			.failures_remaining
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
			.is_ok()
	}
}

#[async_trait]
impl Transport for InMemTransport {
	async fn connect(&self, endpoint: &str) -> Result<TransportLink, ClientError> {
		if self.take_failure() {
			return Err(ClientError::network("injected connect failure").with_context(endpoint.to_string()));
		}

		let (out_tx, out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
		let (in_tx, in_rx) = mpsc::channel::<TransportFrame>(CHANNEL_CAPACITY);

		let server_end = ServerEnd {
			from_client: out_rx,
			to_client: in_tx,
		};

		self
			.accept_tx
			.send(server_end)
			.await
			.map_err(|_| ClientError::connection_failed("in-memory acceptor is gone").with_context(endpoint.to_string()))?;

		Ok(TransportLink {
			sender: out_tx,
			receiver: in_rx,
		})
	}
}

impl ServerEnd {
	/// Receive and parse the next frame the client sent
	pub async fn recv_envelope(&mut self) -> Option<Envelope> {
		let text = self.from_client.recv().await?;
		Envelope::parse(&text).ok()
	}

	/// Push an envelope to the client as if the server sent it
	pub async fn send_envelope(&self, envelope: &Envelope) -> Result<(), ClientError> {
		let text = envelope.to_json()?;
		self
			.to_client
			.send(TransportFrame::Text(text))
			.await
			.map_err(|_| ClientError::network("client end of in-memory transport is gone"))
	}

	/// Push raw text, bypassing envelope construction (malformed frames etc.)
	pub async fn send_text(&self, text: impl Into<String>) -> Result<(), ClientError> {
		self
			.to_client
			.send(TransportFrame::Text(text.into()))
			.await
			.map_err(|_| ClientError::network("client end of in-memory transport is gone"))
	}

	/// Simulate an unexpected transport close
	pub async fn close(&self, reason: Option<String>) {
		let _ = self.to_client.send(TransportFrame::Closed { reason }).await;
	}
}
