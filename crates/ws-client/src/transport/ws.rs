use super::{Transport, TransportFrame, TransportLink};
use crate::errors::ClientError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TungsteniteMessage};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// WebSocket transport over tokio-tungstenite.
///
/// `connect` splits the stream and spawns a pump pair: a writer draining the
/// outbound channel into the sink, and a reader forwarding text frames to
/// the actor. Transport-level pings are answered at the pump; protocol-level
/// ping/pong (JSON messages) stay the actor's business.
#[derive(Debug, Default, Clone)]
pub struct WsTransport;

impl WsTransport {
	#[must_use]
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Transport for WsTransport {
	async fn connect(&self, endpoint: &str) -> Result<TransportLink, ClientError> {
		let (ws_stream, _) = connect_async(endpoint)
			.await
			.map_err(|e| ClientError::connection_failed(format!("websocket dial failed: {e}")).with_context(endpoint.to_string()))?;

		let (sink, mut stream) = ws_stream.split();
		let sink = Arc::new(Mutex::new(sink));

		let (out_tx, mut out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
		let (in_tx, in_rx) = mpsc::channel::<TransportFrame>(CHANNEL_CAPACITY);

		let writer_sink = sink.clone();
		tokio::spawn(async move {
			while let Some(text) = out_rx.recv().await {
				let mut guard = writer_sink.lock().await;
				if let Err(e) = guard.send(TungsteniteMessage::Text(text.into())).await {
					warn!("websocket write failed: {e}");
					break;
				}
			}
			debug!("websocket writer pump ended");
		});

		tokio::spawn(async move {
			let reason = loop {
				match stream.next().await {
					Some(Ok(TungsteniteMessage::Text(text))) => {
						if in_tx.send(TransportFrame::Text(text.to_string())).await.is_err() {
							// Actor dropped the link; nothing left to deliver to.
							return;
						}
					}
					Some(Ok(TungsteniteMessage::Ping(payload))) => {
						let mut guard = sink.lock().await;
						let _ = guard.send(TungsteniteMessage::Pong(payload)).await;
					}
					Some(Ok(TungsteniteMessage::Close(frame))) => {
						break frame.map(|f| f.reason.to_string());
					}
					Some(Ok(_)) => {}
					Some(Err(e)) => break Some(e.to_string()),
					None => break None,
				}
			};

			let _ = in_tx.send(TransportFrame::Closed { reason }).await;
			debug!("websocket reader pump ended");
		});

		Ok(TransportLink {
			sender: out_tx,
			receiver: in_rx,
		})
	}
}
