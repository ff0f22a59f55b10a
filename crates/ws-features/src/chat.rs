use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;
use ws_client::{ClientError, ClientHandle, Priority, SendOutcome};
use ws_messages::{ChatMessageData, Envelope, MessageId, MessageType, Payload, ReceiptData, TypingData};

/// Messages kept per room before the oldest is evicted
const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Idle window after which an unfinished `start_typing` is auto-stopped
const TYPING_IDLE: Duration = Duration::from_secs(5);

/// Who the local user is on the wire; typing frames carry both fields
#[derive(Debug, Clone)]
pub struct ChatIdentity {
	pub user_id: String,
	pub user_name: String,
}

/// One chat message as cached locally. Receipt flags flip when the matching
/// `message_delivered` / `message_read` frames arrive.
#[derive(Debug, Clone)]
pub struct ChatEntry {
	pub id: MessageId,
	pub room: Option<String>,
	pub user_id: Option<String>,
	pub content: String,
	pub reply_to: Option<String>,
	pub received_at: DateTime<Utc>,
	pub delivered: bool,
	pub read: bool,
}

#[derive(Default)]
struct ChatCache {
	history: HashMap<String, VecDeque<ChatEntry>>,
	capacity: usize,
}

impl ChatCache {
	fn push(&mut self, room: &str, entry: ChatEntry) {
		let band = self.history.entry(room.to_string()).or_default();
		band.push_back(entry);
		while band.len() > self.capacity {
			band.pop_front();
		}
	}

	fn mark(&mut self, message_id: &str, read: bool) {
		for band in self.history.values_mut() {
			for entry in band.iter_mut() {
				if entry.id.as_str() == message_id {
					if read {
						entry.read = true;
					}
					entry.delivered = true;
				}
			}
		}
	}
}

/// Chat operations composed over the client handle: sending, receipts,
/// typing indicators, and a bounded per-room history cache independent of
/// any server-side history.
pub struct ChatAdapter {
	handle: ClientHandle,
	identity: ChatIdentity,
	cache: Arc<Mutex<ChatCache>>,
	typing: Arc<Mutex<HashMap<String, CancellationToken>>>,
	typing_idle: Duration,
	subscription: Uuid,
}

impl ChatAdapter {
	pub async fn attach(handle: ClientHandle, identity: ChatIdentity) -> Result<Self, ClientError> {
		Self::attach_with_capacity(handle, identity, DEFAULT_HISTORY_CAPACITY).await
	}

	pub async fn attach_with_capacity(handle: ClientHandle, identity: ChatIdentity, capacity: usize) -> Result<Self, ClientError> {
		let cache = Arc::new(Mutex::new(ChatCache {
			history: HashMap::new(),
			capacity,
		}));

		let sink = cache.clone();
		let subscription = handle
			.subscribe(
				vec![MessageType::ChatMessage, MessageType::DirectMessage, MessageType::MessageDelivered, MessageType::MessageRead],
				None,
				move |envelope| {
					let mut cache = sink.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
					match &envelope.payload {
						Payload::Chat(data) => {
							let room = envelope.room.clone().unwrap_or_else(|| "direct".to_string());
							cache.push(
								&room,
								ChatEntry {
									id: envelope.id.clone(),
									room: envelope.room.clone(),
									user_id: envelope.user_id.clone(),
									content: data.content.clone(),
									reply_to: data.reply_to.clone(),
									received_at: Utc::now(),
									delivered: false,
									read: false,
								},
							);
						}
						Payload::Receipt(receipt) => {
							cache.mark(&receipt.message_id, envelope.message_type == MessageType::MessageRead);
						}
						_ => {}
					}
					Ok(())
				},
			)
			.await?;

		Ok(Self {
			handle,
			identity,
			cache,
			typing: Arc::new(Mutex::new(HashMap::new())),
			typing_idle: TYPING_IDLE,
			subscription,
		})
	}

	/// Override the idle window before an automatic `typing_stop`
	#[must_use]
	pub fn with_typing_idle(mut self, idle: Duration) -> Self {
		self.typing_idle = idle;
		self
	}

	/// Send a chat message to a room. Content is validated (1..=4000 chars)
	/// before anything is enqueued; the message id is returned for receipt
	/// tracking.
	pub async fn send_message(&self, room: &str, content: &str, reply_to: Option<&str>) -> Result<MessageId, ClientError> {
		let mut data = ChatMessageData::new(content)?;
		if let Some(reply_to) = reply_to {
			data = data.with_reply_to(reply_to);
		}

		let envelope = Envelope::new(MessageType::ChatMessage, Payload::Chat(data)).with_room(room).with_user(self.identity.user_id.clone());
		let id = envelope.id.clone();

		self.handle.send(envelope, Priority::Normal).await?;
		Ok(id)
	}

	/// Send a direct message; `user_id` on the envelope addresses the peer
	pub async fn send_direct(&self, to_user: &str, content: &str) -> Result<MessageId, ClientError> {
		let data = ChatMessageData::new(content)?;
		let envelope = Envelope::new(MessageType::DirectMessage, Payload::Chat(data)).with_user(to_user);
		let id = envelope.id.clone();

		self.handle.send(envelope, Priority::Normal).await?;
		Ok(id)
	}

	pub async fn mark_delivered(&self, message_id: &MessageId) -> Result<SendOutcome, ClientError> {
		self.send_receipt(MessageType::MessageDelivered, message_id).await
	}

	pub async fn mark_read(&self, message_id: &MessageId) -> Result<SendOutcome, ClientError> {
		self.send_receipt(MessageType::MessageRead, message_id).await
	}

	async fn send_receipt(&self, message_type: MessageType, message_id: &MessageId) -> Result<SendOutcome, ClientError> {
		let envelope = Envelope::new(
			message_type,
			Payload::Receipt(ReceiptData {
				message_id: message_id.to_string(),
			}),
		)
		.with_user(self.identity.user_id.clone());
		self.handle.send(envelope, Priority::Low).await
	}

	/// Announce typing in a room. A stop frame goes out automatically after
	/// an idle window even if the caller never calls `stop_typing`.
	pub async fn start_typing(&self, room: &str) -> Result<(), ClientError> {
		self.send_typing(MessageType::TypingStart, room).await?;

		let token = CancellationToken::new();
		{
			let mut typing = self.typing.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
			if let Some(previous) = typing.insert(room.to_string(), token.clone()) {
				previous.cancel();
			}
		}

		let handle = self.handle.clone();
		let identity = self.identity.clone();
		let typing = self.typing.clone();
		let idle = self.typing_idle;
		let room = room.to_string();
		tokio::spawn(async move {
			tokio::select! {
				() = token.cancelled() => {}
				() = tokio::time::sleep(idle) => {
					debug!(room = %room, "typing idle; auto-stopping");
					typing.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&room);
					let envelope = typing_envelope(MessageType::TypingStop, &room, &identity);
					let _ = handle.send(envelope, Priority::Low).await;
				}
			}
		});

		Ok(())
	}

	pub async fn stop_typing(&self, room: &str) -> Result<(), ClientError> {
		if let Some(token) = self.typing.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(room) {
			token.cancel();
		}
		self.send_typing(MessageType::TypingStop, room).await
	}

	async fn send_typing(&self, message_type: MessageType, room: &str) -> Result<(), ClientError> {
		let envelope = typing_envelope(message_type, room, &self.identity);
		self.handle.send(envelope, Priority::Low).await.map(|_| ())
	}

	/// Most recent messages for a room, oldest first
	#[must_use]
	pub fn recent(&self, room: &str) -> Vec<ChatEntry> {
		let cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
		cache.history.get(room).map(|band| band.iter().cloned().collect()).unwrap_or_default()
	}

	/// Register an application callback for chat messages in one room
	pub async fn on_message<F>(&self, room: &str, mut callback: F) -> Result<Uuid, ClientError>
	where
		F: FnMut(&Envelope) + Send + Sync + 'static,
	{
		self
			.handle
			.subscribe(vec![MessageType::ChatMessage], Some(room.to_string()), move |envelope| {
				callback(envelope);
				Ok(())
			})
			.await
	}

	/// Drop the adapter's subscription; cached history stays readable
	pub async fn detach(&self) {
		let _ = self.handle.unsubscribe(self.subscription).await;
		for token in self.typing.lock().unwrap_or_else(std::sync::PoisonError::into_inner).values() {
			token.cancel();
		}
	}
}

fn typing_envelope(message_type: MessageType, room: &str, identity: &ChatIdentity) -> Envelope {
	Envelope::new(
		message_type,
		Payload::Typing(TypingData {
			user_id: identity.user_id.clone(),
			user_name: identity.user_name.clone(),
		}),
	)
	.with_room(room)
	.with_user(identity.user_id.clone())
}
