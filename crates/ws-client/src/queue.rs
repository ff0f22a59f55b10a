use crate::errors::ClientError;
use std::collections::VecDeque;
use std::time::Instant;
use ws_messages::Envelope;

/// Default cap on delivery attempts before a queued message is dropped and
/// reported as a failed send.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Outbound priority, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
	Low,
	Normal,
	High,
	Urgent,
}

impl Priority {
	const fn band(self) -> usize {
		match self {
			Priority::Low => 0,
			Priority::Normal => 1,
			Priority::High => 2,
			Priority::Urgent => 3,
		}
	}
}

#[derive(Debug, Clone)]
pub struct QueuedMessage {
	pub envelope: Envelope,
	pub priority: Priority,
	pub attempts: u32,
	pub max_attempts: u32,
	pub queued_at: Instant,
}

/// Bounded outbound buffer, drained priority-then-FIFO on reconnect.
///
/// Admission when full evicts the lowest-priority, oldest entry whose
/// priority does not exceed the incoming message's; if every resident entry
/// outranks the newcomer, the enqueue is rejected instead.
#[derive(Debug)]
pub struct OutboundQueue {
	bands: [VecDeque<QueuedMessage>; 4],
	capacity: usize,
}

impl OutboundQueue {
	#[must_use]
	pub fn new(capacity: usize) -> Self {
		Self {
			bands: [VecDeque::new(), VecDeque::new(), VecDeque::new(), VecDeque::new()],
			capacity,
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.bands.iter().map(VecDeque::len).sum()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.bands.iter().all(VecDeque::is_empty)
	}

	pub fn enqueue(&mut self, envelope: Envelope, priority: Priority) -> Result<(), ClientError> {
		if self.len() >= self.capacity {
			let evicted = self.evict_for(priority);
			if !evicted {
				return Err(ClientError::queue_full(format!("outbound queue at capacity {} with no lower-priority entry to evict", self.capacity)));
			}
		}

		self.bands[priority.band()].push_back(QueuedMessage {
			envelope,
			priority,
			attempts: 0,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			queued_at: Instant::now(),
		});
		Ok(())
	}

	/// Next message to flush: highest band first, FIFO within a band
	pub fn pop_next(&mut self) -> Option<QueuedMessage> {
		self.bands.iter_mut().rev().find_map(VecDeque::pop_front)
	}

	/// Put a message back at the head of its band, preserving flush order
	/// after a failed attempt.
	pub fn requeue_front(&mut self, message: QueuedMessage) {
		self.bands[message.priority.band()].push_front(message);
	}

	pub fn clear(&mut self) {
		for band in &mut self.bands {
			band.clear();
		}
	}

	/// Drop the oldest entry at or below `priority`, lowest band first
	fn evict_for(&mut self, priority: Priority) -> bool {
		for band in &mut self.bands[..=priority.band()] {
			if band.pop_front().is_some() {
				return true;
			}
		}
		false
	}
}
