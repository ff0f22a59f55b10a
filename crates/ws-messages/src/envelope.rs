use crate::error::MessageError;
use crate::message_type::MessageType;
use crate::payload::Payload;
use crate::types::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One wire message. Immutable once constructed; outbound envelopes get a
/// generated id and timestamp, inbound envelopes carry whatever the peer sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
	pub id: MessageId,
	pub message_type: MessageType,
	/// Epoch milliseconds
	pub timestamp: i64,
	pub user_id: Option<String>,
	pub room: Option<String>,
	pub payload: Payload,
}

/// Wire shape of the envelope before payload decoding
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
	id: MessageId,
	#[serde(rename = "type")]
	message_type: MessageType,
	timestamp: i64,
	#[serde(skip_serializing_if = "Option::is_none")]
	user_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	room: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	data: Option<Value>,
}

impl Envelope {
	/// Construct an outbound envelope with generated id and current timestamp.
	///
	/// The payload variant must belong to `message_type`'s family; mixing
	/// them up is a programming error, not a runtime condition.
	#[must_use]
	pub fn new(message_type: MessageType, payload: Payload) -> Self {
		debug_assert!(payload.matches(&message_type), "payload variant does not belong to {message_type}");
		Self {
			id: MessageId::generate(),
			message_type,
			timestamp: chrono::Utc::now().timestamp_millis(),
			user_id: None,
			room: None,
			payload,
		}
	}

	#[must_use]
	pub fn with_room(mut self, room: impl Into<String>) -> Self {
		self.room = Some(room.into());
		self
	}

	#[must_use]
	pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());
		self
	}

	#[must_use]
	pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
		self.id = id.into();
		self
	}

	/// Parse an inbound frame.
	///
	/// A frame that fails to deserialize, or whose `type` is not a string,
	/// is malformed. Absent `data` is tolerated as `{}`. An unknown `type`
	/// parses fine and carries its data raw.
	pub fn parse(text: &str) -> Result<Self, MessageError> {
		let raw: RawEnvelope = serde_json::from_str(text).map_err(|e| MessageError::Malformed(e.to_string()))?;
		let data = raw.data.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
		let payload = Payload::decode(&raw.message_type, data)?;

		Ok(Self {
			id: raw.id,
			message_type: raw.message_type,
			timestamp: raw.timestamp,
			user_id: raw.user_id,
			room: raw.room,
			payload,
		})
	}

	/// Serialize to the JSON wire form
	pub fn to_json(&self) -> Result<String, MessageError> {
		let raw = RawEnvelope {
			id: self.id.clone(),
			message_type: self.message_type.clone(),
			timestamp: self.timestamp,
			user_id: self.user_id.clone(),
			room: self.room.clone(),
			data: Some(self.payload.encode()?),
		};
		Ok(serde_json::to_string(&raw)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::payload::{ChatMessageData, PresenceData, PresenceStatus};
	use serde_json::json;

	#[test]
	fn test_round_trip_chat_message() {
		let envelope = Envelope::new(MessageType::ChatMessage, Payload::Chat(ChatMessageData::new("namaste").unwrap()))
			.with_room("general")
			.with_user("u42");

		let text = envelope.to_json().unwrap();
		let parsed = Envelope::parse(&text).unwrap();
		assert_eq!(parsed, envelope);
	}

	#[test]
	fn test_round_trip_presence() {
		let envelope = Envelope::new(
			MessageType::PresenceUpdate,
			Payload::Presence(PresenceData {
				user_id: "u1".to_string(),
				status: PresenceStatus::Busy,
				last_seen: None,
				custom_status: Some("in meditation".to_string()),
			}),
		);

		let parsed = Envelope::parse(&envelope.to_json().unwrap()).unwrap();
		assert_eq!(parsed, envelope);
	}

	#[test]
	fn test_missing_data_is_tolerated() {
		let text = json!({ "id": "m1", "type": "ping", "timestamp": 1000 }).to_string();
		let envelope = Envelope::parse(&text).unwrap();
		assert_eq!(envelope.message_type, MessageType::Ping);
		assert_eq!(envelope.payload, Payload::empty());
	}

	#[test]
	fn test_unknown_type_parses_as_passthrough() {
		let text = json!({
			"id": "m2",
			"type": "mystery_blob",
			"timestamp": 2000,
			"data": { "x": 1 }
		})
		.to_string();

		let envelope = Envelope::parse(&text).unwrap();
		assert_eq!(envelope.message_type, MessageType::Other("mystery_blob".to_string()));
		assert_eq!(envelope.payload, Payload::Raw(json!({ "x": 1 })));
	}

	#[test]
	fn test_non_string_type_is_malformed() {
		let text = json!({ "id": "m3", "type": 7, "timestamp": 3000 }).to_string();
		assert!(matches!(Envelope::parse(&text), Err(MessageError::Malformed(_))));
	}

	#[test]
	fn test_garbage_frame_is_malformed() {
		assert!(matches!(Envelope::parse("{nope"), Err(MessageError::Malformed(_))));
	}
}
