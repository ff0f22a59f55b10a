pub mod envelope;
pub mod error;
pub mod message_type;
pub mod payload;
pub mod types;

pub use envelope::Envelope;
pub use error::MessageError;
pub use message_type::MessageType;
pub use payload::{
	Attachment, AttachmentKind, AuthRequestData, AuthResultData, ChatMessageData, ErrorData, EventAction, EventUpdateData, NotificationCategory, NotificationData,
	Payload, PresenceData, PresenceStatus, ReceiptData, RoomAckData, RoomRequestData, SystemNoticeData, TypingData, UserEventData,
};
pub use types::MessageId;
