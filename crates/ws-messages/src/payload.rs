use crate::error::MessageError;
use crate::message_type::MessageType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Upper bound on chat message body length, matched server-side.
pub const MAX_CHAT_CONTENT_LEN: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
	Image,
	File,
	Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: AttachmentKind,
	pub url: String,
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageData {
	pub content: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reply_to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mentions: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attachments: Option<Vec<Attachment>>,
}

impl ChatMessageData {
	/// Build a chat payload, enforcing the content length bounds
	pub fn new(content: impl Into<String>) -> Result<Self, MessageError> {
		let data = Self {
			content: content.into(),
			reply_to: None,
			mentions: None,
			attachments: None,
		};
		data.validate()?;
		Ok(data)
	}

	#[must_use]
	pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
		self.reply_to = Some(reply_to.into());
		self
	}

	/// Content must be 1..=4000 chars; enforced before anything is queued
	/// or sent, and again on inbound frames.
	pub fn validate(&self) -> Result<(), MessageError> {
		let len = self.content.chars().count();
		if len == 0 {
			return Err(MessageError::Validation("chat content must not be empty".to_string()));
		}
		if len > MAX_CHAT_CONTENT_LEN {
			return Err(MessageError::Validation(format!("chat content exceeds {MAX_CHAT_CONTENT_LEN} chars (got {len})")));
		}
		Ok(())
	}
}

/// Delivery/read receipt referencing an earlier chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptData {
	pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingData {
	pub user_id: String,
	pub user_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
	Online,
	Offline,
	Away,
	Busy,
}

impl fmt::Display for PresenceStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			PresenceStatus::Online => "online",
			PresenceStatus::Offline => "offline",
			PresenceStatus::Away => "away",
			PresenceStatus::Busy => "busy",
		};
		write!(f, "{s}")
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceData {
	pub user_id: String,
	pub status: PresenceStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_seen: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub custom_status: Option<String>,
}

/// Payload of `user_online` / `user_offline` announcements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEventData {
	pub user_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
	Info,
	Warning,
	Error,
	Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
	pub title: String,
	pub body: String,
	pub category: NotificationCategory,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub action_url: Option<String>,
	pub dismissible: bool,
	pub persistent: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub read: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
	Created,
	Updated,
	Cancelled,
	Reminder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdateData {
	pub event_id: String,
	pub action: EventAction,
	pub event_data: Value,
}

/// Outbound auth handshake, sent once the transport is up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequestData {
	pub token: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub permissions: Option<Vec<String>>,
}

/// Inbound `auth_success` / `auth_failure` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResultData {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub permissions: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequestData {
	pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAckData {
	pub room_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub members: Option<Vec<String>>,
}

/// Server-reported protocol error frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	pub message: String,
}

/// `system_alert` / `server_maintenance` notices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemNoticeData {
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub severity: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scheduled_at: Option<String>,
}

/// Typed payload variants, one per known message family.
///
/// Types the protocol leaves unconstrained (collaboration cursors, heartbeat
/// echoes, server-introduced types) carry their JSON verbatim in `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
	Chat(ChatMessageData),
	Receipt(ReceiptData),
	Typing(TypingData),
	Presence(PresenceData),
	UserEvent(UserEventData),
	Notification(NotificationData),
	Event(EventUpdateData),
	AuthRequest(AuthRequestData),
	AuthResult(AuthResultData),
	RoomRequest(RoomRequestData),
	RoomAck(RoomAckData),
	ServerError(ErrorData),
	SystemNotice(SystemNoticeData),
	Raw(Value),
}

impl Payload {
	#[must_use]
	pub fn empty() -> Self {
		Payload::Raw(Value::Object(serde_json::Map::new()))
	}

	/// Decode `data` against the schema for `message_type`.
	///
	/// Unknown and schema-less types fall through to `Raw`; a known type
	/// whose data does not match its schema is a payload error.
	pub fn decode(message_type: &MessageType, data: Value) -> Result<Self, MessageError> {
		fn typed<T, F>(message_type: &MessageType, data: Value, wrap: F) -> Result<Payload, MessageError>
		where
			T: serde::de::DeserializeOwned,
			F: FnOnce(T) -> Payload,
		{
			serde_json::from_value::<T>(data).map(wrap).map_err(|source| MessageError::Payload {
				message_type: message_type.to_string(),
				source,
			})
		}

		let payload = match message_type {
			MessageType::ChatMessage | MessageType::DirectMessage => {
				let decoded = typed::<ChatMessageData, _>(message_type, data, Payload::Chat)?;
				if let Payload::Chat(chat) = &decoded {
					chat.validate()?;
				}
				decoded
			}
			MessageType::MessageDelivered | MessageType::MessageRead => typed::<ReceiptData, _>(message_type, data, Payload::Receipt)?,
			MessageType::TypingStart | MessageType::TypingStop => typed::<TypingData, _>(message_type, data, Payload::Typing)?,
			MessageType::PresenceUpdate | MessageType::UserStatusChange => typed::<PresenceData, _>(message_type, data, Payload::Presence)?,
			MessageType::UserOnline | MessageType::UserOffline => typed::<UserEventData, _>(message_type, data, Payload::UserEvent)?,
			MessageType::Notification | MessageType::Announcement => typed::<NotificationData, _>(message_type, data, Payload::Notification)?,
			MessageType::EventUpdate | MessageType::EventReminder => typed::<EventUpdateData, _>(message_type, data, Payload::Event)?,
			MessageType::Auth => typed::<AuthRequestData, _>(message_type, data, Payload::AuthRequest)?,
			MessageType::AuthSuccess | MessageType::AuthFailure => typed::<AuthResultData, _>(message_type, data, Payload::AuthResult)?,
			MessageType::JoinRoom | MessageType::LeaveRoom => typed::<RoomRequestData, _>(message_type, data, Payload::RoomRequest)?,
			MessageType::RoomJoined | MessageType::RoomLeft => typed::<RoomAckData, _>(message_type, data, Payload::RoomAck)?,
			MessageType::Error => typed::<ErrorData, _>(message_type, data, Payload::ServerError)?,
			MessageType::SystemAlert | MessageType::ServerMaintenance => typed::<SystemNoticeData, _>(message_type, data, Payload::SystemNotice)?,
			MessageType::Ping | MessageType::Pong | MessageType::DocumentEdit | MessageType::CursorPosition | MessageType::SelectionChange | MessageType::Other(_) => {
				Payload::Raw(data)
			}
		};

		Ok(payload)
	}

	/// Encode back to the wire `data` object
	pub fn encode(&self) -> Result<Value, MessageError> {
		let value = match self {
			Payload::Chat(d) => serde_json::to_value(d)?,
			Payload::Receipt(d) => serde_json::to_value(d)?,
			Payload::Typing(d) => serde_json::to_value(d)?,
			Payload::Presence(d) => serde_json::to_value(d)?,
			Payload::UserEvent(d) => serde_json::to_value(d)?,
			Payload::Notification(d) => serde_json::to_value(d)?,
			Payload::Event(d) => serde_json::to_value(d)?,
			Payload::AuthRequest(d) => serde_json::to_value(d)?,
			Payload::AuthResult(d) => serde_json::to_value(d)?,
			Payload::RoomRequest(d) => serde_json::to_value(d)?,
			Payload::RoomAck(d) => serde_json::to_value(d)?,
			Payload::ServerError(d) => serde_json::to_value(d)?,
			Payload::SystemNotice(d) => serde_json::to_value(d)?,
			Payload::Raw(v) => v.clone(),
		};
		Ok(value)
	}

	/// Check whether this payload variant is the one `message_type` decodes to
	#[must_use]
	pub fn matches(&self, message_type: &MessageType) -> bool {
		match self {
			Payload::Chat(_) => matches!(message_type, MessageType::ChatMessage | MessageType::DirectMessage),
			Payload::Receipt(_) => matches!(message_type, MessageType::MessageDelivered | MessageType::MessageRead),
			Payload::Typing(_) => matches!(message_type, MessageType::TypingStart | MessageType::TypingStop),
			Payload::Presence(_) => matches!(message_type, MessageType::PresenceUpdate | MessageType::UserStatusChange),
			Payload::UserEvent(_) => matches!(message_type, MessageType::UserOnline | MessageType::UserOffline),
			Payload::Notification(_) => matches!(message_type, MessageType::Notification | MessageType::Announcement),
			Payload::Event(_) => matches!(message_type, MessageType::EventUpdate | MessageType::EventReminder),
			Payload::AuthRequest(_) => matches!(message_type, MessageType::Auth),
			Payload::AuthResult(_) => matches!(message_type, MessageType::AuthSuccess | MessageType::AuthFailure),
			Payload::RoomRequest(_) => matches!(message_type, MessageType::JoinRoom | MessageType::LeaveRoom),
			Payload::RoomAck(_) => matches!(message_type, MessageType::RoomJoined | MessageType::RoomLeft),
			Payload::ServerError(_) => matches!(message_type, MessageType::Error),
			Payload::SystemNotice(_) => matches!(message_type, MessageType::SystemAlert | MessageType::ServerMaintenance),
			Payload::Raw(_) => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_chat_content_bounds() {
		assert!(ChatMessageData::new("hello").is_ok());
		assert!(ChatMessageData::new("").is_err());
		assert!(ChatMessageData::new("x".repeat(4000)).is_ok());
		assert!(ChatMessageData::new("x".repeat(4001)).is_err());
	}

	#[test]
	fn test_decode_rejects_overlong_inbound_chat() {
		let data = json!({ "content": "y".repeat(4001) });
		let err = Payload::decode(&MessageType::ChatMessage, data);
		assert!(matches!(err, Err(MessageError::Validation(_))));
	}

	#[test]
	fn test_decode_presence_payload() {
		let data = json!({ "userId": "u1", "status": "away" });
		let payload = Payload::decode(&MessageType::PresenceUpdate, data).unwrap();
		match payload {
			Payload::Presence(p) => {
				assert_eq!(p.user_id, "u1");
				assert_eq!(p.status, PresenceStatus::Away);
				assert!(p.last_seen.is_none());
			}
			other => panic!("Expected presence payload, got {other:?}"),
		}
	}

	#[test]
	fn test_decode_bad_schema_is_payload_error() {
		let data = json!({ "status": "online" }); // missing userId
		let err = Payload::decode(&MessageType::PresenceUpdate, data);
		assert!(matches!(err, Err(MessageError::Payload { .. })));
	}

	#[test]
	fn test_unknown_type_decodes_raw() {
		let data = json!({ "anything": [1, 2, 3] });
		let payload = Payload::decode(&MessageType::Other("new_thing".to_string()), data.clone()).unwrap();
		assert_eq!(payload, Payload::Raw(data));
	}

	#[test]
	fn test_attachment_kind_wire_names() {
		let att = Attachment {
			id: "a1".to_string(),
			kind: AttachmentKind::Image,
			url: "https://example.com/a.png".to_string(),
			name: "a.png".to_string(),
			size: Some(1024),
		};
		let value = serde_json::to_value(&att).unwrap();
		assert_eq!(value["type"], "image");
	}
}
