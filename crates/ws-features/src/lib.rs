pub mod chat;
pub mod events;
pub mod notifications;
pub mod presence;

pub use chat::{ChatAdapter, ChatEntry, ChatIdentity};
pub use events::{EventEntry, EventsAdapter};
pub use notifications::{NotificationEntry, NotificationsAdapter};
pub use presence::{PresenceAdapter, PresenceEntry};
