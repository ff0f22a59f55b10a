use crate::errors::ClientError;
use tracing::debug;
use uuid::Uuid;
use ws_messages::{Envelope, MessageType};

/// Handler invoked for each matching inbound message. An `Err` is isolated
/// and reported; it never stops dispatch to the remaining handlers.
pub type HandlerFn = Box<dyn FnMut(&Envelope) -> Result<(), ClientError> + Send + Sync>;

pub struct Subscription {
	pub id: Uuid,
	/// Empty list means wildcard: every inbound message matches
	types: Vec<MessageType>,
	room: Option<String>,
	once: bool,
	handler: HandlerFn,
}

impl Subscription {
	fn matches(&self, envelope: &Envelope) -> bool {
		let type_ok = self.types.is_empty() || self.types.contains(&envelope.message_type);
		let room_ok = match &self.room {
			Some(room) => envelope.room.as_deref() == Some(room.as_str()),
			None => true,
		};
		type_ok && room_ok
	}
}

/// In-process pub/sub dispatch: inbound messages fan out to registered
/// handlers by type and optional room scope, in registration order.
#[derive(Default)]
pub struct SubscriptionRouter {
	subscriptions: Vec<Subscription>,
}

impl SubscriptionRouter {
	#[must_use]
	pub fn new() -> Self {
		Self { subscriptions: Vec::new() }
	}

	pub fn subscribe(&mut self, types: Vec<MessageType>, room: Option<String>, once: bool, handler: HandlerFn) -> Uuid {
		let id = Uuid::new_v4();
		self.subscriptions.push(Subscription { id, types, room, once, handler });
		id
	}

	/// Remove a subscription. Returns whether it existed; removing twice is
	/// safe and returns false the second time.
	pub fn unsubscribe(&mut self, id: Uuid) -> bool {
		let before = self.subscriptions.len();
		self.subscriptions.retain(|s| s.id != id);
		self.subscriptions.len() != before
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.subscriptions.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.subscriptions.is_empty()
	}

	/// Dispatch one message to every matching handler in registration order.
	///
	/// `once` subscriptions are removed after their invocation completes, so
	/// a handler cannot re-fire during its own invocation. Handler failures
	/// are collected for the caller to report; dispatch always continues.
	pub fn dispatch(&mut self, envelope: &Envelope) -> Vec<ClientError> {
		let mut failures = Vec::new();
		let mut fired_once = Vec::new();

		for subscription in &mut self.subscriptions {
			if !subscription.matches(envelope) {
				continue;
			}

			if let Err(err) = (subscription.handler)(envelope) {
				debug!(subscription = %subscription.id, error = %err, "handler failed during dispatch");
				failures.push(err.with_context(format!("handler {} for {}", subscription.id, envelope.message_type)));
			}

			if subscription.once {
				fired_once.push(subscription.id);
			}
		}

		if !fired_once.is_empty() {
			self.subscriptions.retain(|s| !fired_once.contains(&s.id));
		}

		failures
	}
}
