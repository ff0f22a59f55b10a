use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use ws_client::{ClientError, ClientHandle, Priority, SendOutcome};
use ws_messages::{Envelope, MessageId, MessageType, NotificationData, Payload, ReceiptData};

/// Notifications kept locally before the oldest is evicted
const DEFAULT_FEED_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct NotificationEntry {
	pub id: MessageId,
	pub data: NotificationData,
	pub received_at: DateTime<Utc>,
	pub read: bool,
}

/// Notification feed over the client handle. Announcements fold into the
/// same feed; the cache is bounded and independent of server history.
pub struct NotificationsAdapter {
	handle: ClientHandle,
	feed: Arc<Mutex<VecDeque<NotificationEntry>>>,
	subscription: Uuid,
}

impl NotificationsAdapter {
	pub async fn attach(handle: ClientHandle) -> Result<Self, ClientError> {
		Self::attach_with_capacity(handle, DEFAULT_FEED_CAPACITY).await
	}

	pub async fn attach_with_capacity(handle: ClientHandle, capacity: usize) -> Result<Self, ClientError> {
		let feed: Arc<Mutex<VecDeque<NotificationEntry>>> = Arc::new(Mutex::new(VecDeque::new()));

		let sink = feed.clone();
		let subscription = handle
			.subscribe(vec![MessageType::Notification, MessageType::Announcement], None, move |envelope| {
				if let Payload::Notification(data) = &envelope.payload {
					let mut feed = sink.lock().unwrap_or_else(PoisonError::into_inner);
					feed.push_back(NotificationEntry {
						id: envelope.id.clone(),
						data: data.clone(),
						received_at: Utc::now(),
						read: data.read.unwrap_or(false),
					});
					while feed.len() > capacity {
						feed.pop_front();
					}
				}
				Ok(())
			})
			.await?;

		Ok(Self { handle, feed, subscription })
	}

	/// Flip the local read flag and ack it to the server
	pub async fn mark_read(&self, id: &MessageId) -> Result<SendOutcome, ClientError> {
		{
			let mut feed = self.feed.lock().unwrap_or_else(PoisonError::into_inner);
			for entry in feed.iter_mut() {
				if entry.id == *id {
					entry.read = true;
				}
			}
		}

		let envelope = Envelope::new(MessageType::MessageRead, Payload::Receipt(ReceiptData { message_id: id.to_string() }));
		self.handle.send(envelope, Priority::Low).await
	}

	/// Remove a dismissible notification locally; false when it is missing
	/// or not dismissible.
	pub fn dismiss(&self, id: &MessageId) -> bool {
		let mut feed = self.feed.lock().unwrap_or_else(PoisonError::into_inner);
		let before = feed.len();
		feed.retain(|entry| entry.id != *id || !entry.data.dismissible);
		feed.len() != before
	}

	#[must_use]
	pub fn unread_count(&self) -> usize {
		self.feed.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|entry| !entry.read).count()
	}

	/// Snapshot of the feed, oldest first
	#[must_use]
	pub fn recent(&self) -> Vec<NotificationEntry> {
		self.feed.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
	}

	/// Register an application callback for incoming notifications
	pub async fn on_notification<F>(&self, mut callback: F) -> Result<Uuid, ClientError>
	where
		F: FnMut(&Envelope) + Send + Sync + 'static,
	{
		self
			.handle
			.subscribe(vec![MessageType::Notification, MessageType::Announcement], None, move |envelope| {
				callback(envelope);
				Ok(())
			})
			.await
	}

	pub async fn detach(&self) {
		let _ = self.handle.unsubscribe(self.subscription).await;
	}
}
