use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use ws_client::{ClientError, ClientHandle};
use ws_messages::{Envelope, EventAction, EventUpdateData, MessageId, MessageType, Payload};

/// Event updates kept locally before the oldest is evicted
const DEFAULT_CACHE_CAPACITY: usize = 25;

#[derive(Debug, Clone)]
pub struct EventEntry {
	pub id: MessageId,
	pub data: EventUpdateData,
	pub received_at: DateTime<Utc>,
	/// Reminder was shown/acknowledged locally
	pub acknowledged: bool,
}

/// Community-event updates and reminders over the client handle
pub struct EventsAdapter {
	handle: ClientHandle,
	cache: Arc<Mutex<VecDeque<EventEntry>>>,
	subscription: Uuid,
}

impl EventsAdapter {
	pub async fn attach(handle: ClientHandle) -> Result<Self, ClientError> {
		Self::attach_with_capacity(handle, DEFAULT_CACHE_CAPACITY).await
	}

	pub async fn attach_with_capacity(handle: ClientHandle, capacity: usize) -> Result<Self, ClientError> {
		let cache: Arc<Mutex<VecDeque<EventEntry>>> = Arc::new(Mutex::new(VecDeque::new()));

		let sink = cache.clone();
		let subscription = handle
			.subscribe(vec![MessageType::EventUpdate, MessageType::EventReminder], None, move |envelope| {
				if let Payload::Event(data) = &envelope.payload {
					let mut cache = sink.lock().unwrap_or_else(PoisonError::into_inner);
					cache.push_back(EventEntry {
						id: envelope.id.clone(),
						data: data.clone(),
						received_at: Utc::now(),
						acknowledged: false,
					});
					while cache.len() > capacity {
						cache.pop_front();
					}
				}
				Ok(())
			})
			.await?;

		Ok(Self { handle, cache, subscription })
	}

	/// Mark every cached reminder for an event as seen. Local bookkeeping
	/// only; the server does not track reminder acks.
	pub fn ack_reminder(&self, event_id: &str) -> usize {
		let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
		let mut acked = 0;
		for entry in cache.iter_mut() {
			if entry.data.event_id == event_id && entry.data.action == EventAction::Reminder && !entry.acknowledged {
				entry.acknowledged = true;
				acked += 1;
			}
		}
		acked
	}

	/// Pending reminders, oldest first
	#[must_use]
	pub fn pending_reminders(&self) -> Vec<EventEntry> {
		self
			.cache
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.filter(|entry| entry.data.action == EventAction::Reminder && !entry.acknowledged)
			.cloned()
			.collect()
	}

	/// Snapshot of all cached event activity, oldest first
	#[must_use]
	pub fn recent(&self) -> Vec<EventEntry> {
		self.cache.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
	}

	/// Register an application callback for event updates
	pub async fn on_event<F>(&self, mut callback: F) -> Result<Uuid, ClientError>
	where
		F: FnMut(&Envelope) + Send + Sync + 'static,
	{
		self
			.handle
			.subscribe(vec![MessageType::EventUpdate, MessageType::EventReminder], None, move |envelope| {
				callback(envelope);
				Ok(())
			})
			.await
	}

	pub async fn detach(&self) {
		let _ = self.handle.unsubscribe(self.subscription).await;
	}
}
