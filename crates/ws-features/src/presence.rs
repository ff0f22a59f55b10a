use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use ws_client::{ClientError, ClientHandle, Priority, SendOutcome};
use ws_messages::{Envelope, MessageType, Payload, PresenceData, PresenceStatus};

/// Last known presence of one user
#[derive(Debug, Clone)]
pub struct PresenceEntry {
	pub user_id: String,
	pub status: PresenceStatus,
	pub custom_status: Option<String>,
	pub last_seen: Option<String>,
	pub updated_at: DateTime<Utc>,
}

/// Presence operations: broadcast the local status, keep a roster of
/// everyone else's. The roster is whatever the server has told us; there is
/// no polling.
pub struct PresenceAdapter {
	handle: ClientHandle,
	user_id: String,
	roster: Arc<Mutex<HashMap<String, PresenceEntry>>>,
	subscription: Uuid,
}

impl PresenceAdapter {
	pub async fn attach(handle: ClientHandle, user_id: impl Into<String>) -> Result<Self, ClientError> {
		let roster: Arc<Mutex<HashMap<String, PresenceEntry>>> = Arc::new(Mutex::new(HashMap::new()));

		let sink = roster.clone();
		let subscription = handle
			.subscribe(
				vec![MessageType::PresenceUpdate, MessageType::UserStatusChange, MessageType::UserOnline, MessageType::UserOffline],
				None,
				move |envelope| {
					let mut roster = sink.lock().unwrap_or_else(PoisonError::into_inner);
					match &envelope.payload {
						Payload::Presence(data) => {
							roster.insert(
								data.user_id.clone(),
								PresenceEntry {
									user_id: data.user_id.clone(),
									status: data.status,
									custom_status: data.custom_status.clone(),
									last_seen: data.last_seen.clone(),
									updated_at: Utc::now(),
								},
							);
						}
						Payload::UserEvent(data) => {
							let status = if envelope.message_type == MessageType::UserOnline {
								PresenceStatus::Online
							} else {
								PresenceStatus::Offline
							};
							roster.insert(
								data.user_id.clone(),
								PresenceEntry {
									user_id: data.user_id.clone(),
									status,
									custom_status: None,
									last_seen: None,
									updated_at: Utc::now(),
								},
							);
						}
						_ => {}
					}
					Ok(())
				},
			)
			.await?;

		Ok(Self {
			handle,
			user_id: user_id.into(),
			roster,
			subscription,
		})
	}

	/// Broadcast the local user's status
	pub async fn set_status(&self, status: PresenceStatus, custom_status: Option<String>) -> Result<SendOutcome, ClientError> {
		let envelope = Envelope::new(
			MessageType::PresenceUpdate,
			Payload::Presence(PresenceData {
				user_id: self.user_id.clone(),
				status,
				last_seen: None,
				custom_status,
			}),
		)
		.with_user(self.user_id.clone());

		self.handle.send(envelope, Priority::Normal).await
	}

	#[must_use]
	pub fn status_of(&self, user_id: &str) -> Option<PresenceEntry> {
		self.roster.lock().unwrap_or_else(PoisonError::into_inner).get(user_id).cloned()
	}

	#[must_use]
	pub fn roster(&self) -> Vec<PresenceEntry> {
		self.roster.lock().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
	}

	/// Register an application callback for presence changes
	pub async fn on_change<F>(&self, mut callback: F) -> Result<Uuid, ClientError>
	where
		F: FnMut(&Envelope) + Send + Sync + 'static,
	{
		self
			.handle
			.subscribe(
				vec![MessageType::PresenceUpdate, MessageType::UserStatusChange, MessageType::UserOnline, MessageType::UserOffline],
				None,
				move |envelope| {
					callback(envelope);
					Ok(())
				},
			)
			.await
	}

	pub async fn detach(&self) {
		let _ = self.handle.unsubscribe(self.subscription).await;
	}
}
