use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Message ID type for type safety
///
/// Outbound messages get a generated v4 uuid; inbound ids are carried
/// verbatim since peers may use their own id scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
	#[must_use]
	pub fn generate() -> Self {
		Self(Uuid::new_v4().to_string())
	}

	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for MessageId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<String> for MessageId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&str> for MessageId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}
