use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire vocabulary of the realtime protocol.
///
/// An unrecognized wire string maps to `Other` rather than an error so a
/// newer server can introduce types without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
	Ping,
	Pong,
	Auth,
	AuthSuccess,
	AuthFailure,
	JoinRoom,
	LeaveRoom,
	RoomJoined,
	RoomLeft,
	ChatMessage,
	DirectMessage,
	MessageDelivered,
	MessageRead,
	TypingStart,
	TypingStop,
	EventUpdate,
	EventReminder,
	Notification,
	Announcement,
	UserOnline,
	UserOffline,
	UserStatusChange,
	PresenceUpdate,
	DocumentEdit,
	CursorPosition,
	SelectionChange,
	SystemAlert,
	ServerMaintenance,
	Error,
	Other(String),
}

impl MessageType {
	/// Get the wire string for this message type
	#[must_use]
	pub fn wire_str(&self) -> &str {
		match self {
			MessageType::Ping => "ping",
			MessageType::Pong => "pong",
			MessageType::Auth => "auth",
			MessageType::AuthSuccess => "auth_success",
			MessageType::AuthFailure => "auth_failure",
			MessageType::JoinRoom => "join_room",
			MessageType::LeaveRoom => "leave_room",
			MessageType::RoomJoined => "room_joined",
			MessageType::RoomLeft => "room_left",
			MessageType::ChatMessage => "chat_message",
			MessageType::DirectMessage => "direct_message",
			MessageType::MessageDelivered => "message_delivered",
			MessageType::MessageRead => "message_read",
			MessageType::TypingStart => "typing_start",
			MessageType::TypingStop => "typing_stop",
			MessageType::EventUpdate => "event_update",
			MessageType::EventReminder => "event_reminder",
			MessageType::Notification => "notification",
			MessageType::Announcement => "announcement",
			MessageType::UserOnline => "user_online",
			MessageType::UserOffline => "user_offline",
			MessageType::UserStatusChange => "user_status_change",
			MessageType::PresenceUpdate => "presence_update",
			MessageType::DocumentEdit => "document_edit",
			MessageType::CursorPosition => "cursor_position",
			MessageType::SelectionChange => "selection_change",
			MessageType::SystemAlert => "system_alert",
			MessageType::ServerMaintenance => "server_maintenance",
			MessageType::Error => "error",
			MessageType::Other(s) => s,
		}
	}

	/// Parse a wire string, falling back to `Other` for unknown types
	#[must_use]
	pub fn from_wire(s: &str) -> Self {
		match s {
			"ping" => MessageType::Ping,
			"pong" => MessageType::Pong,
			"auth" => MessageType::Auth,
			"auth_success" => MessageType::AuthSuccess,
			"auth_failure" => MessageType::AuthFailure,
			"join_room" => MessageType::JoinRoom,
			"leave_room" => MessageType::LeaveRoom,
			"room_joined" => MessageType::RoomJoined,
			"room_left" => MessageType::RoomLeft,
			"chat_message" => MessageType::ChatMessage,
			"direct_message" => MessageType::DirectMessage,
			"message_delivered" => MessageType::MessageDelivered,
			"message_read" => MessageType::MessageRead,
			"typing_start" => MessageType::TypingStart,
			"typing_stop" => MessageType::TypingStop,
			"event_update" => MessageType::EventUpdate,
			"event_reminder" => MessageType::EventReminder,
			"notification" => MessageType::Notification,
			"announcement" => MessageType::Announcement,
			"user_online" => MessageType::UserOnline,
			"user_offline" => MessageType::UserOffline,
			"user_status_change" => MessageType::UserStatusChange,
			"presence_update" => MessageType::PresenceUpdate,
			"document_edit" => MessageType::DocumentEdit,
			"cursor_position" => MessageType::CursorPosition,
			"selection_change" => MessageType::SelectionChange,
			"system_alert" => MessageType::SystemAlert,
			"server_maintenance" => MessageType::ServerMaintenance,
			"error" => MessageType::Error,
			other => MessageType::Other(other.to_string()),
		}
	}

	/// Heartbeat frames are connection bookkeeping, not application traffic
	#[must_use]
	pub fn is_heartbeat(&self) -> bool {
		matches!(self, MessageType::Ping | MessageType::Pong)
	}

	/// Check whether this type is part of the known vocabulary
	#[must_use]
	pub fn is_known(&self) -> bool {
		!matches!(self, MessageType::Other(_))
	}
}

impl fmt::Display for MessageType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.wire_str())
	}
}

impl std::str::FromStr for MessageType {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::from_wire(s))
	}
}

impl Serialize for MessageType {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.wire_str())
	}
}

impl<'de> Deserialize<'de> for MessageType {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		Ok(Self::from_wire(&s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wire_round_trip_for_known_types() {
		let types = [
			MessageType::Ping,
			MessageType::AuthSuccess,
			MessageType::JoinRoom,
			MessageType::ChatMessage,
			MessageType::TypingStart,
			MessageType::PresenceUpdate,
			MessageType::ServerMaintenance,
			MessageType::Error,
		];

		for ty in types {
			assert_eq!(MessageType::from_wire(ty.wire_str()), ty);
		}
	}

	#[test]
	fn test_unknown_type_becomes_other() {
		let ty = MessageType::from_wire("shiny_new_feature");
		assert_eq!(ty, MessageType::Other("shiny_new_feature".to_string()));
		assert_eq!(ty.wire_str(), "shiny_new_feature");
		assert!(!ty.is_known());
	}
}
