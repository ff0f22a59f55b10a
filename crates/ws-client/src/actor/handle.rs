use crate::actor::command::Command;
use crate::actor::state::ConnectionInfo;
use crate::actor::ConnectionActor;
use crate::config::ClientConfig;
use crate::errors::{ClientError, SendOutcome};
use crate::events::ClientEvent;
use crate::metrics::PerformanceMetrics;
use crate::queue::Priority;
use crate::rooms::RoomSubscription;
use crate::transport::{ws::WsTransport, Transport};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;
use ws_messages::{Envelope, MessageType, Payload};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 128;

/// Cloneable handle to one connection actor.
///
/// All operations go through the actor's command channel, so they are
/// serialized with inbound dispatch and timer handling. Operations that
/// await a server ack (`connect`, `join_room`) resolve when the ack arrives
/// or their timeout elapses; they never hang forever.
#[derive(Clone)]
pub struct ClientHandle {
	command_tx: mpsc::Sender<Command>,
	event_keep_alive: async_broadcast::InactiveReceiver<ClientEvent>,
}

impl ClientHandle {
	/// Spawn a connection actor with an injected transport
	#[must_use]
	pub fn spawn(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
		let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
		let (mut event_tx, event_rx) = async_broadcast::broadcast(EVENT_CAPACITY);
		event_tx.set_overflow(true);
		event_tx.set_await_active(false);
		let event_keep_alive = event_rx.deactivate();

		let actor = ConnectionActor::new(config, transport, command_rx, command_tx.clone(), event_tx);
		tokio::spawn(actor.run());

		Self { command_tx, event_keep_alive }
	}

	/// Spawn with the real WebSocket transport
	#[must_use]
	pub fn spawn_websocket(config: ClientConfig) -> Self {
		Self::spawn(config, Arc::new(WsTransport::new()))
	}

	/// Subscribe to lifecycle and error events. Each receiver gets its own
	/// cursor; slow receivers lose oldest events rather than blocking.
	#[must_use]
	pub fn events(&self) -> async_broadcast::Receiver<ClientEvent> {
		self.event_keep_alive.activate_cloned()
	}

	pub async fn connect(&self) -> Result<(), ClientError> {
		let (tx, rx) = oneshot::channel();
		self.command(Command::Connect { respond_to: tx }).await?;
		rx.await.map_err(|_| Self::actor_gone())?
	}

	/// Manual retry: resets the attempt counter and works even after
	/// automatic reconnection has given up.
	pub async fn reconnect(&self) -> Result<(), ClientError> {
		let (tx, rx) = oneshot::channel();
		self.command(Command::Reconnect { respond_to: tx }).await?;
		rx.await.map_err(|_| Self::actor_gone())?
	}

	/// Tear down the transport and timers, keeping queued messages for the
	/// next connect.
	pub async fn disconnect(&self) {
		let (tx, rx) = oneshot::channel();
		if self.command(Command::Disconnect { respond_to: tx }).await.is_ok() {
			let _ = rx.await;
		}
	}

	/// Terminal teardown: drops the queue and stops the actor
	pub async fn shutdown(&self) {
		let (tx, rx) = oneshot::channel();
		if self.command(Command::Shutdown { respond_to: tx }).await.is_ok() {
			let _ = rx.await;
		}
	}

	/// Send a message, queueing it when not connected. Chat payloads are
	/// validated before anything is enqueued.
	pub async fn send(&self, envelope: Envelope, priority: Priority) -> Result<SendOutcome, ClientError> {
		if let Payload::Chat(chat) = &envelope.payload {
			chat.validate()?;
		}

		let (tx, rx) = oneshot::channel();
		self.command(Command::Send { envelope, priority, respond_to: tx }).await?;
		rx.await.map_err(|_| Self::actor_gone())?
	}

	/// Join a room, resolving true once the server acks. Idempotent: joining
	/// a room twice resolves true immediately.
	pub async fn join_room(&self, room: impl Into<String>) -> bool {
		let (tx, rx) = oneshot::channel();
		let cmd = Command::JoinRoom { room: room.into(), respond_to: tx };
		if self.command(cmd).await.is_err() {
			return false;
		}
		rx.await.unwrap_or(false)
	}

	pub async fn leave_room(&self, room: impl Into<String>) -> bool {
		let (tx, rx) = oneshot::channel();
		let cmd = Command::LeaveRoom { room: room.into(), respond_to: tx };
		if self.command(cmd).await.is_err() {
			return false;
		}
		rx.await.unwrap_or(false)
	}

	pub async fn rooms(&self) -> Vec<RoomSubscription> {
		let (tx, rx) = oneshot::channel();
		if self.command(Command::Rooms { respond_to: tx }).await.is_err() {
			return Vec::new();
		}
		rx.await.unwrap_or_default()
	}

	/// Register a handler for one or more message types, optionally scoped
	/// to a room. An empty type list subscribes to everything, including
	/// server-introduced types the client does not know.
	pub async fn subscribe<F>(&self, types: Vec<MessageType>, room: Option<String>, handler: F) -> Result<Uuid, ClientError>
	where
		F: FnMut(&Envelope) -> Result<(), ClientError> + Send + Sync + 'static,
	{
		self.subscribe_inner(types, room, false, Box::new(handler)).await
	}

	/// Like `subscribe`, but auto-unsubscribes after the first dispatch
	pub async fn subscribe_once<F>(&self, types: Vec<MessageType>, room: Option<String>, handler: F) -> Result<Uuid, ClientError>
	where
		F: FnMut(&Envelope) -> Result<(), ClientError> + Send + Sync + 'static,
	{
		self.subscribe_inner(types, room, true, Box::new(handler)).await
	}

	async fn subscribe_inner(&self, types: Vec<MessageType>, room: Option<String>, once: bool, handler: crate::router::HandlerFn) -> Result<Uuid, ClientError> {
		let (tx, rx) = oneshot::channel();
		self
			.command(Command::Subscribe {
				types,
				room,
				once,
				handler,
				respond_to: tx,
			})
			.await?;
		rx.await.map_err(|_| Self::actor_gone())
	}

	/// Remove a subscription; false when the id is unknown or already gone
	pub async fn unsubscribe(&self, id: Uuid) -> bool {
		let (tx, rx) = oneshot::channel();
		if self.command(Command::Unsubscribe { id, respond_to: tx }).await.is_err() {
			return false;
		}
		rx.await.unwrap_or(false)
	}

	pub async fn info(&self) -> Result<ConnectionInfo, ClientError> {
		let (tx, rx) = oneshot::channel();
		self.command(Command::Info { respond_to: tx }).await?;
		rx.await.map_err(|_| Self::actor_gone())
	}

	pub async fn metrics(&self) -> Result<PerformanceMetrics, ClientError> {
		let (tx, rx) = oneshot::channel();
		self.command(Command::Metrics { respond_to: tx }).await?;
		rx.await.map_err(|_| Self::actor_gone())
	}

	pub async fn reset_metrics(&self) {
		let _ = self.command(Command::ResetMetrics).await;
	}

	async fn command(&self, command: Command) -> Result<(), ClientError> {
		self.command_tx.send(command).await.map_err(|_| Self::actor_gone())
	}

	fn actor_gone() -> ClientError {
		ClientError::connection_failed("connection actor is gone").fatal()
	}
}
