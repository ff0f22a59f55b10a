use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::oneshot;
use tracing::debug;
use ws_messages::MessageType;

/// A room the local connection has joined.
///
/// Room subscriptions do not survive a disconnect: the whole set is cleared
/// whenever the connection leaves `Connected`, and callers must rejoin
/// explicitly after a reconnect. There is no automatic rejoin.
#[derive(Debug, Clone)]
pub struct RoomSubscription {
	pub room_id: String,
	pub joined_at: DateTime<Utc>,
	/// Types of interest for this room; informational only
	pub message_types: HashSet<MessageType>,
	pub is_active: bool,
}

/// One in-flight join/leave round-trip awaiting its server ack
struct PendingAck {
	waiters: Vec<oneshot::Sender<bool>>,
	generation: u64,
}

/// Tracks joined rooms and the join/leave handshakes in flight
#[derive(Default)]
pub struct RoomManager {
	rooms: HashMap<String, RoomSubscription>,
	pending_joins: HashMap<String, PendingAck>,
	pending_leaves: HashMap<String, PendingAck>,
}

impl RoomManager {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn is_joined(&self, room_id: &str) -> bool {
		self.rooms.contains_key(room_id)
	}

	#[must_use]
	pub fn rooms(&self) -> Vec<RoomSubscription> {
		self.rooms.values().cloned().collect()
	}

	#[must_use]
	pub fn count(&self) -> usize {
		self.rooms.len()
	}

	/// Register a waiter for a join ack. Returns true when this is the first
	/// waiter, i.e. the caller must actually send `join_room` and arm the
	/// timeout.
	pub fn begin_join(&mut self, room_id: &str, responder: oneshot::Sender<bool>, generation: u64) -> bool {
		match self.pending_joins.get_mut(room_id) {
			Some(pending) => {
				pending.waiters.push(responder);
				false
			}
			None => {
				self.pending_joins.insert(
					room_id.to_string(),
					PendingAck {
						waiters: vec![responder],
						generation,
					},
				);
				true
			}
		}
	}

	pub fn begin_leave(&mut self, room_id: &str, responder: oneshot::Sender<bool>, generation: u64) -> bool {
		match self.pending_leaves.get_mut(room_id) {
			Some(pending) => {
				pending.waiters.push(responder);
				false
			}
			None => {
				self.pending_leaves.insert(
					room_id.to_string(),
					PendingAck {
						waiters: vec![responder],
						generation,
					},
				);
				true
			}
		}
	}

	/// Server acked the join: record the room and wake every waiter
	pub fn confirm_join(&mut self, room_id: &str) {
		self.rooms.insert(
			room_id.to_string(),
			RoomSubscription {
				room_id: room_id.to_string(),
				joined_at: Utc::now(),
				message_types: HashSet::new(),
				is_active: true,
			},
		);
		Self::resolve(&mut self.pending_joins, room_id, true);
	}

	pub fn confirm_leave(&mut self, room_id: &str) {
		self.rooms.remove(room_id);
		Self::resolve(&mut self.pending_leaves, room_id, true);
	}

	/// Timeout fired for a join. Only acts when the generation matches the
	/// handshake that armed it; a stale timer from a previous connection is
	/// ignored.
	pub fn timeout_join(&mut self, room_id: &str, generation: u64) -> bool {
		if self.pending_joins.get(room_id).is_some_and(|p| p.generation == generation) {
			debug!(room = room_id, "join_room ack timed out");
			Self::resolve(&mut self.pending_joins, room_id, false);
			return true;
		}
		false
	}

	pub fn timeout_leave(&mut self, room_id: &str, generation: u64) -> bool {
		if self.pending_leaves.get(room_id).is_some_and(|p| p.generation == generation) {
			debug!(room = room_id, "leave_room ack timed out");
			Self::resolve(&mut self.pending_leaves, room_id, false);
			return true;
		}
		false
	}

	/// Drop every room and fail every pending handshake. Called on any
	/// transition out of `Connected`.
	pub fn clear(&mut self) -> usize {
		let count = self.rooms.len();
		self.rooms.clear();

		for room_id in self.pending_joins.keys().cloned().collect::<Vec<_>>() {
			Self::resolve(&mut self.pending_joins, &room_id, false);
		}
		for room_id in self.pending_leaves.keys().cloned().collect::<Vec<_>>() {
			Self::resolve(&mut self.pending_leaves, &room_id, false);
		}

		count
	}

	fn resolve(pending: &mut HashMap<String, PendingAck>, room_id: &str, success: bool) {
		if let Some(ack) = pending.remove(room_id) {
			for waiter in ack.waiters {
				let _ = waiter.send(success);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_confirm_join_records_room_and_wakes_waiters() {
		let mut rooms = RoomManager::new();
		let (tx, rx) = oneshot::channel();

		assert!(rooms.begin_join("general", tx, 1));
		rooms.confirm_join("general");

		assert!(rooms.is_joined("general"));
		assert_eq!(rx.blocking_recv(), Ok(true));
	}

	#[test]
	fn test_second_waiter_does_not_resend() {
		let mut rooms = RoomManager::new();
		let (tx1, rx1) = oneshot::channel();
		let (tx2, rx2) = oneshot::channel();

		assert!(rooms.begin_join("general", tx1, 1));
		assert!(!rooms.begin_join("general", tx2, 1));

		rooms.confirm_join("general");
		assert_eq!(rx1.blocking_recv(), Ok(true));
		assert_eq!(rx2.blocking_recv(), Ok(true));
	}

	#[test]
	fn test_stale_timeout_generation_is_ignored() {
		let mut rooms = RoomManager::new();
		let (tx, rx) = oneshot::channel();

		rooms.begin_join("general", tx, 7);
		assert!(!rooms.timeout_join("general", 3));
		assert!(rooms.timeout_join("general", 7));
		assert_eq!(rx.blocking_recv(), Ok(false));
		assert!(!rooms.is_joined("general"));
	}

	#[test]
	fn test_clear_fails_pending_and_empties_rooms() {
		let mut rooms = RoomManager::new();
		rooms.confirm_join("a");
		rooms.confirm_join("b");

		let (tx, rx) = oneshot::channel();
		rooms.begin_join("c", tx, 1);

		assert_eq!(rooms.clear(), 2);
		assert_eq!(rooms.count(), 0);
		assert_eq!(rx.blocking_recv(), Ok(false));
	}
}
