pub mod command;
pub mod handle;
pub mod state;

pub use handle::ClientHandle;
pub use state::{ConnectionInfo, ConnectionState};

use crate::config::ClientConfig;
use crate::errors::{ClientError, ErrorKind, SendOutcome};
use crate::events::ClientEvent;
use crate::metrics::PerformanceMetrics;
use crate::queue::{OutboundQueue, Priority};
use crate::rooms::RoomManager;
use crate::router::SubscriptionRouter;
use crate::transport::{Transport, TransportFrame, TransportLink};
use command::{Command, Internal};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ws_messages::{AuthRequestData, Envelope, MessageType, Payload, RoomRequestData};

/// Consecutive unanswered pings before the connection is declared dead
const MAX_MISSED_PONGS: u32 = 2;

/// Owns all mutable connection state. Runs as a single task; every state
/// transition, dispatch, and queue operation happens on this task, so no
/// locking is needed anywhere in the client.
pub struct ConnectionActor {
	config: ClientConfig,
	transport: Arc<dyn Transport>,
	command_rx: mpsc::Receiver<Command>,
	/// Clone handed to spawned dial/timer tasks so their outcomes come back
	/// through the same serialized command stream.
	command_tx: mpsc::Sender<Command>,
	event_tx: async_broadcast::Sender<ClientEvent>,

	info: ConnectionInfo,
	metrics: PerformanceMetrics,
	router: SubscriptionRouter,
	rooms: RoomManager,
	queue: OutboundQueue,
	link: Option<TransportLink>,

	connect_waiters: Vec<oneshot::Sender<Result<(), ClientError>>>,
	authenticating: bool,
	missed_pongs: u32,

	// Generation counters invalidate in-flight dials, handshake timeouts,
	// and retry timers on disconnect without tracking task handles.
	connect_generation: u64,
	auth_generation: u64,
	retry_generation: u64,
	ack_generation: u64,

	shutdown_token: CancellationToken,
}

impl ConnectionActor {
	pub fn new(
		config: ClientConfig,
		transport: Arc<dyn Transport>,
		command_rx: mpsc::Receiver<Command>,
		command_tx: mpsc::Sender<Command>,
		event_tx: async_broadcast::Sender<ClientEvent>,
	) -> Self {
		let queue = OutboundQueue::new(config.message_queue_size);
		Self {
			config,
			transport,
			command_rx,
			command_tx,
			event_tx,
			info: ConnectionInfo::new(),
			metrics: PerformanceMetrics::new(),
			router: SubscriptionRouter::new(),
			rooms: RoomManager::new(),
			queue,
			link: None,
			connect_waiters: Vec::new(),
			authenticating: false,
			missed_pongs: 0,
			connect_generation: 0,
			auth_generation: 0,
			retry_generation: 0,
			ack_generation: 0,
			shutdown_token: CancellationToken::new(),
		}
	}

	pub async fn run(mut self) {
		let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
		heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select! {
				cmd = self.command_rx.recv() => match cmd {
					Some(cmd) => {
						if self.handle_command(cmd).await.is_break() {
							break;
						}
					}
					None => break,
				},
				frame = Self::next_frame(&mut self.link) => self.handle_frame(frame).await,
				_ = heartbeat.tick() => self.handle_heartbeat_tick(),
			}
		}

		self.shutdown_token.cancel();
		info!("connection actor stopped");
	}

	/// Pending forever while no transport is attached, so the select arm
	/// only fires with a live link.
	async fn next_frame(link: &mut Option<TransportLink>) -> TransportFrame {
		match link {
			Some(l) => l.receiver.recv().await.unwrap_or(TransportFrame::Closed { reason: None }),
			None => std::future::pending().await,
		}
	}

	async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
		match command {
			Command::Connect { respond_to } => self.handle_connect(respond_to),
			Command::Reconnect { respond_to } => {
				self.info.reconnect_attempts = 0;
				self.handle_connect(respond_to);
			}
			Command::Disconnect { respond_to } => {
				self.teardown(ConnectionState::Disconnected);
				let _ = respond_to.send(());
			}
			Command::Shutdown { respond_to } => {
				self.teardown(ConnectionState::Closed);
				self.queue.clear();
				let _ = respond_to.send(());
				return ControlFlow::Break(());
			}
			Command::Send { envelope, priority, respond_to } => {
				let outcome = self.send_or_queue(envelope, priority);
				let _ = respond_to.send(outcome);
			}
			Command::JoinRoom { room, respond_to } => self.handle_join(room, respond_to),
			Command::LeaveRoom { room, respond_to } => self.handle_leave(room, respond_to),
			Command::Rooms { respond_to } => {
				let _ = respond_to.send(self.rooms.rooms());
			}
			Command::Subscribe {
				types,
				room,
				once,
				handler,
				respond_to,
			} => {
				let id = self.router.subscribe(types, room, once, handler);
				let _ = respond_to.send(id);
			}
			Command::Unsubscribe { id, respond_to } => {
				let _ = respond_to.send(self.router.unsubscribe(id));
			}
			Command::Info { respond_to } => {
				let _ = respond_to.send(self.info.clone());
			}
			Command::Metrics { respond_to } => {
				let mut snapshot = self.metrics.clone();
				if let Some(session) = self.info.uptime() {
					snapshot.record_uptime(session);
				}
				let _ = respond_to.send(snapshot);
			}
			Command::ResetMetrics => self.metrics.reset(),
			Command::Internal(internal) => self.handle_internal(internal).await,
		}
		ControlFlow::Continue(())
	}

	async fn handle_internal(&mut self, internal: Internal) {
		match internal {
			Internal::ConnectOutcome { generation, result } => {
				if generation != self.connect_generation || self.info.state != ConnectionState::Connecting {
					// Stale dial; dropping the link (if any) tears it down.
					return;
				}
				match result {
					Ok(link) => {
						self.link = Some(link);
						if self.config.auth_token.is_some() {
							self.begin_auth().await;
						} else {
							self.finish_connect().await;
						}
					}
					Err(err) => self.fail_connect(err),
				}
			}
			Internal::AuthTimeout { generation } => {
				if generation == self.auth_generation && self.authenticating && self.info.state == ConnectionState::Connecting {
					self.fail_connect(ClientError::timeout("authentication ack timed out").with_context("auth"));
				}
			}
			Internal::RetryTick { generation } => {
				if generation != self.retry_generation || self.info.state != ConnectionState::Reconnecting {
					return;
				}
				self.info.reconnect_attempts += 1;
				debug!(attempt = self.info.reconnect_attempts, "reconnect attempt firing");
				self.transition(ConnectionState::Connecting);
				self.spawn_connect();
			}
			Internal::JoinTimeout { room, generation } => {
				if self.rooms.timeout_join(&room, generation) {
					self.report(ClientError::timeout("join_room ack timed out").with_context(room));
				}
			}
			Internal::LeaveTimeout { room, generation } => {
				if self.rooms.timeout_leave(&room, generation) {
					self.report(ClientError::timeout("leave_room ack timed out").with_context(room));
				}
			}
		}
	}

	// ---- connect / disconnect ------------------------------------------

	fn handle_connect(&mut self, respond_to: oneshot::Sender<Result<(), ClientError>>) {
		match self.info.state {
			ConnectionState::Connected => {
				let _ = respond_to.send(Ok(()));
			}
			ConnectionState::Connecting | ConnectionState::Reconnecting => {
				self.connect_waiters.push(respond_to);
			}
			ConnectionState::Disconnected | ConnectionState::Error | ConnectionState::Closed => {
				self.connect_waiters.push(respond_to);
				self.transition(ConnectionState::Connecting);
				self.spawn_connect();
			}
		}
	}

	fn spawn_connect(&mut self) {
		self.connect_generation += 1;
		let generation = self.connect_generation;
		let transport = self.transport.clone();
		let endpoint = self.config.endpoint();
		let timeout = self.config.connection_timeout;
		let tx = self.command_tx.clone();

		tokio::spawn(async move {
			let result = match tokio::time::timeout(timeout, transport.connect(&endpoint)).await {
				Ok(result) => result,
				Err(_) => Err(ClientError::timeout(format!("connect to {endpoint} timed out"))),
			};
			let _ = tx.send(Command::Internal(Internal::ConnectOutcome { generation, result })).await;
		});
	}

	async fn begin_auth(&mut self) {
		let token = self.config.auth_token.clone().unwrap_or_default();
		let envelope = Envelope::new(
			MessageType::Auth,
			Payload::AuthRequest(AuthRequestData {
				token,
				refresh_token: None,
				user_id: self.info.user_id.clone(),
				permissions: None,
			}),
		);

		if !self.send_direct(&envelope).await {
			self.fail_connect(ClientError::network("transport dropped before auth handshake"));
			return;
		}

		self.authenticating = true;
		self.auth_generation += 1;
		self.spawn_internal(self.config.connection_timeout, Internal::AuthTimeout { generation: self.auth_generation });
	}

	async fn finish_connect(&mut self) {
		self.info.connected_at = Some(Instant::now());
		self.info.reconnect_attempts = 0;
		self.missed_pongs = 0;
		self.transition(ConnectionState::Connected);
		info!(endpoint = %self.config.endpoint(), "connected");
		self.emit(ClientEvent::Connected(self.info.clone()));

		for waiter in self.connect_waiters.drain(..) {
			let _ = waiter.send(Ok(()));
		}

		self.flush_queue().await;
	}

	fn fail_connect(&mut self, err: ClientError) {
		self.link = None;
		self.authenticating = false;
		self.metrics.record_error();
		if self.info.reconnect_attempts > 0 {
			self.metrics.record_reconnection();
		}
		warn!(error = %err, "connect attempt failed");
		self.emit(ClientEvent::Error(err.clone()));

		for waiter in self.connect_waiters.drain(..) {
			let _ = waiter.send(Err(err.clone()));
		}

		self.transition(ConnectionState::Error);
		self.maybe_schedule_retry();
	}

	fn maybe_schedule_retry(&mut self) {
		if !self.config.auto_reconnect {
			return;
		}
		if self.info.reconnect_attempts >= self.config.max_reconnect_attempts {
			self.give_up();
			return;
		}

		self.transition(ConnectionState::Reconnecting);
		self.retry_generation += 1;
		self.spawn_internal(self.config.reconnect_interval, Internal::RetryTick { generation: self.retry_generation });
	}

	fn give_up(&mut self) {
		let attempts = self.info.reconnect_attempts;
		warn!(attempts, "reconnect attempts exhausted; giving up");
		self.transition(ConnectionState::Closed);
		self.emit(ClientEvent::ReconnectExhausted { attempts });
		self.emit(ClientEvent::Error(
			ClientError::connection_failed(format!("connection lost after {attempts} reconnect attempts")).fatal(),
		));
	}

	/// Universal cancellation point: tears down the transport, timers, and
	/// every in-flight handshake. The outbound queue survives unless the
	/// target state is terminal.
	fn teardown(&mut self, target: ConnectionState) {
		self.connect_generation += 1;
		self.auth_generation += 1;
		self.retry_generation += 1;
		self.ack_generation += 1;

		let cancelled = ClientError::connection_failed("cancelled by disconnect").fatal();
		for waiter in self.connect_waiters.drain(..) {
			let _ = waiter.send(Err(cancelled.clone()));
		}

		self.rooms.clear();
		self.link = None;
		self.authenticating = false;
		self.missed_pongs = 0;

		if let Some(session) = self.info.uptime() {
			self.metrics.record_uptime(session);
		}
		self.info.reset_session();

		self.transition(target);
		self.emit(ClientEvent::Disconnected(self.info.clone()));
	}

	/// Unexpected transport-level close (not caller-initiated)
	fn handle_transport_closed(&mut self, reason: Option<String>) {
		match self.info.state {
			ConnectionState::Connected => {
				warn!(reason = reason.as_deref().unwrap_or("none"), "transport closed unexpectedly");
				self.link = None;
				self.missed_pongs = 0;
				self.rooms.clear();
				if let Some(session) = self.info.uptime() {
					self.metrics.record_uptime(session);
				}
				self.info.reset_session();
				self.emit(ClientEvent::Disconnected(self.info.clone()));

				if self.config.auto_reconnect {
					self.maybe_schedule_retry();
				} else {
					self.transition(ConnectionState::Error);
					self.report(ClientError::network(format!("connection lost: {}", reason.unwrap_or_else(|| "transport closed".to_string()))));
				}
			}
			ConnectionState::Connecting => {
				self.fail_connect(ClientError::network(format!("transport closed during handshake: {}", reason.unwrap_or_else(|| "unknown".to_string()))));
			}
			_ => {
				// Close from a link we no longer care about.
				self.link = None;
			}
		}
	}

	// ---- send path ------------------------------------------------------

	fn send_or_queue(&mut self, envelope: Envelope, priority: Priority) -> Result<SendOutcome, ClientError> {
		if self.info.state == ConnectionState::Connected {
			if let Some(link) = &self.link {
				let text = envelope.to_json()?;
				match link.sender.try_send(text) {
					Ok(()) => {
						self.metrics.record_sent();
						return Ok(SendOutcome::Sent);
					}
					Err(_) => {
						// Transport backpressure or a close racing in; park it.
						debug!("immediate send failed, queueing");
					}
				}
			}
		}

		self.queue.enqueue(envelope, priority)?;
		Ok(SendOutcome::Queued)
	}

	/// Drain queued messages after a successful (re)connect, priority bands
	/// first, FIFO within each band.
	async fn flush_queue(&mut self) {
		while let Some(mut entry) = self.queue.pop_next() {
			if entry.attempts >= entry.max_attempts {
				self.report_send_failure(&entry.envelope, "max send attempts exceeded");
				continue;
			}
			entry.attempts += 1;

			let text = match entry.envelope.to_json() {
				Ok(text) => text,
				Err(err) => {
					self.report_send_failure(&entry.envelope, err.to_string());
					continue;
				}
			};

			let Some(link) = &self.link else {
				self.queue.requeue_front(entry);
				return;
			};

			match link.sender.send(text).await {
				Ok(()) => self.metrics.record_sent(),
				Err(_) => {
					if entry.attempts >= entry.max_attempts {
						self.report_send_failure(&entry.envelope, "max send attempts exceeded");
					} else {
						self.queue.requeue_front(entry);
					}
					return;
				}
			}
		}
	}

	fn report_send_failure(&mut self, envelope: &Envelope, reason: impl Into<String>) {
		let err = ClientError::network(reason.into()).with_context(envelope.message_type.to_string());
		self.metrics.record_error();
		self.emit(ClientEvent::SendFailed {
			id: envelope.id.clone(),
			error: err,
		});
	}

	/// Fire-and-forget protocol send outside the queue (auth, acks, pings)
	async fn send_direct(&self, envelope: &Envelope) -> bool {
		let Some(link) = &self.link else { return false };
		let Ok(text) = envelope.to_json() else { return false };
		link.sender.send(text).await.is_ok()
	}

	// ---- rooms ----------------------------------------------------------

	fn handle_join(&mut self, room: String, respond_to: oneshot::Sender<bool>) {
		if self.info.state != ConnectionState::Connected {
			warn!(room = %room, "join_room while not connected");
			let _ = respond_to.send(false);
			return;
		}
		if self.rooms.is_joined(&room) {
			let _ = respond_to.send(true);
			return;
		}

		self.ack_generation += 1;
		let generation = self.ack_generation;
		if self.rooms.begin_join(&room, respond_to, generation) {
			let envelope = Envelope::new(MessageType::JoinRoom, Payload::RoomRequest(RoomRequestData { room_id: room.clone() })).with_room(room.clone());
			self.queue_protocol_send(envelope);
			self.spawn_internal(self.config.connection_timeout, Internal::JoinTimeout { room, generation });
		}
	}

	fn handle_leave(&mut self, room: String, respond_to: oneshot::Sender<bool>) {
		if self.info.state != ConnectionState::Connected || !self.rooms.is_joined(&room) {
			// Leaving a room we are not in is a no-op success.
			let _ = respond_to.send(!self.rooms.is_joined(&room));
			return;
		}

		self.ack_generation += 1;
		let generation = self.ack_generation;
		if self.rooms.begin_leave(&room, respond_to, generation) {
			let envelope = Envelope::new(MessageType::LeaveRoom, Payload::RoomRequest(RoomRequestData { room_id: room.clone() })).with_room(room.clone());
			self.queue_protocol_send(envelope);
			self.spawn_internal(self.config.connection_timeout, Internal::LeaveTimeout { room, generation });
		}
	}

	/// Protocol sends from sync context go through try_send; the link
	/// channel is far larger than any handshake burst.
	fn queue_protocol_send(&self, envelope: Envelope) {
		if let Some(link) = &self.link {
			if let Ok(text) = envelope.to_json() {
				if link.sender.try_send(text).is_err() {
					warn!(message_type = %envelope.message_type, "protocol send failed");
				}
			}
		}
	}

	// ---- inbound --------------------------------------------------------

	async fn handle_frame(&mut self, frame: TransportFrame) {
		match frame {
			TransportFrame::Text(text) => self.handle_text(&text).await,
			TransportFrame::Closed { reason } => self.handle_transport_closed(reason),
		}
	}

	async fn handle_text(&mut self, text: &str) {
		let envelope = match Envelope::parse(text) {
			Ok(envelope) => envelope,
			Err(err) => {
				// Malformed frames are logged and dropped; they never reach
				// subscribers and never desynchronize the client.
				warn!(error = %err, "discarding malformed frame");
				self.metrics.record_error();
				self.report(ClientError::invalid_message(err.to_string()));
				return;
			}
		};

		self.metrics.record_received();
		if self.config.enable_logging {
			debug!(message_type = %envelope.message_type, id = %envelope.id, "frame received");
		}

		match &envelope.message_type {
			MessageType::Ping => {
				let pong = Envelope::new(MessageType::Pong, Payload::empty());
				self.queue_protocol_send(pong);
			}
			MessageType::Pong => self.record_pong(),
			MessageType::AuthSuccess if self.authenticating => {
				self.authenticating = false;
				self.info.is_authenticated = true;
				if let Payload::AuthResult(result) = &envelope.payload {
					self.info.user_id = result.user_id.clone();
				}
				self.finish_connect().await;
			}
			MessageType::AuthFailure if self.authenticating => {
				let detail = match &envelope.payload {
					Payload::AuthResult(result) => result.error.clone().unwrap_or_else(|| "authentication rejected".to_string()),
					_ => "authentication rejected".to_string(),
				};
				self.fail_connect(ClientError::auth_failed(detail));
				return;
			}
			MessageType::RoomJoined => {
				if let Some(room) = Self::ack_room(&envelope) {
					self.rooms.confirm_join(&room);
				}
			}
			MessageType::RoomLeft => {
				if let Some(room) = Self::ack_room(&envelope) {
					self.rooms.confirm_leave(&room);
				}
			}
			MessageType::Error => {
				if let Payload::ServerError(err) = &envelope.payload {
					self.metrics.record_error();
					let kind = err.code.as_deref().map_or(ErrorKind::ServerError, ErrorKind::from_code);
					self.report(ClientError::new(kind, err.message.clone()));
				}
			}
			_ => {}
		}

		let failures = self.router.dispatch(&envelope);
		for failure in failures {
			self.metrics.record_error();
			self.emit(ClientEvent::Error(failure));
		}
	}

	fn ack_room(envelope: &Envelope) -> Option<String> {
		match &envelope.payload {
			Payload::RoomAck(ack) => Some(ack.room_id.clone()),
			_ => envelope.room.clone(),
		}
	}

	fn record_pong(&mut self) {
		let now = Instant::now();
		self.info.last_pong_time = Some(now);
		self.missed_pongs = 0;
		if let Some(ping_at) = self.info.last_ping_time {
			let latency = now.duration_since(ping_at);
			self.info.latency = Some(latency);
			self.metrics.record_latency(latency);
		}
	}

	// ---- heartbeat ------------------------------------------------------

	fn handle_heartbeat_tick(&mut self) {
		if self.info.state != ConnectionState::Connected {
			return;
		}

		let awaiting_pong = match (self.info.last_ping_time, self.info.last_pong_time) {
			(Some(ping), Some(pong)) => pong < ping,
			(Some(_), None) => true,
			_ => false,
		};

		if awaiting_pong {
			self.missed_pongs += 1;
			if self.missed_pongs >= MAX_MISSED_PONGS {
				warn!(missed = self.missed_pongs, "heartbeat lost; treating connection as dead");
				self.link = None;
				self.handle_transport_closed(Some("heartbeat timed out".to_string()));
				return;
			}
		}

		let ping = Envelope::new(MessageType::Ping, Payload::empty());
		self.queue_protocol_send(ping);
		self.info.last_ping_time = Some(Instant::now());
	}

	// ---- plumbing -------------------------------------------------------

	fn spawn_internal(&self, delay: Duration, internal: Internal) {
		let tx = self.command_tx.clone();
		let token = self.shutdown_token.clone();
		tokio::spawn(async move {
			tokio::select! {
				() = token.cancelled() => {}
				() = tokio::time::sleep(delay) => {
					let _ = tx.send(Command::Internal(internal)).await;
				}
			}
		});
	}

	fn transition(&mut self, new: ConnectionState) {
		if self.info.state == new {
			return;
		}
		let old = self.info.state;
		self.info.state = new;
		info!(%old, %new, "connection state changed");
		self.emit(ClientEvent::StateChanged { new, old });
	}

	fn report(&mut self, err: ClientError) {
		self.emit(ClientEvent::Error(err));
	}

	fn emit(&self, event: ClientEvent) {
		// Overflow is enabled on the channel; a full buffer drops the
		// oldest event instead of blocking the actor.
		let _ = self.event_tx.try_broadcast(event);
	}
}
