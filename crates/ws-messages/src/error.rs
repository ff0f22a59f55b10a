use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
	/// Frame could not be deserialized at all, or `type` was missing or
	/// not a string. Malformed frames are logged and dropped upstream,
	/// never dispatched.
	#[error("Malformed frame: {0}")]
	Malformed(String),

	/// Frame had a known `type` but its `data` did not match that type's
	/// schema.
	#[error("Invalid {message_type} payload: {source}")]
	Payload {
		message_type: String,
		#[source]
		source: serde_json::Error,
	},

	/// A field failed domain validation (length, closed set, ...).
	#[error("Validation failed: {0}")]
	Validation(String),

	#[error("Serialization failed: {0}")]
	Serialize(#[from] serde_json::Error),
}
