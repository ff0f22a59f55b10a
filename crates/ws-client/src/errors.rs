use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Closed taxonomy carried on every client error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	ConnectionFailed,
	AuthenticationFailed,
	Unauthorized,
	RateLimited,
	ServerError,
	NetworkError,
	Timeout,
	InvalidMessage,
	RoomAccessDenied,
	UserNotFound,
}

impl ErrorKind {
	/// Map a server-reported error code onto the taxonomy
	#[must_use]
	pub fn from_code(code: &str) -> Self {
		match code {
			"unauthorized" => ErrorKind::Unauthorized,
			"room_access_denied" => ErrorKind::RoomAccessDenied,
			"user_not_found" => ErrorKind::UserNotFound,
			"rate_limited" => ErrorKind::RateLimited,
			"authentication_failed" => ErrorKind::AuthenticationFailed,
			"timeout" => ErrorKind::Timeout,
			_ => ErrorKind::ServerError,
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ErrorKind::ConnectionFailed => "connection_failed",
			ErrorKind::AuthenticationFailed => "authentication_failed",
			ErrorKind::Unauthorized => "unauthorized",
			ErrorKind::RateLimited => "rate_limited",
			ErrorKind::ServerError => "server_error",
			ErrorKind::NetworkError => "network_error",
			ErrorKind::Timeout => "timeout",
			ErrorKind::InvalidMessage => "invalid_message",
			ErrorKind::RoomAccessDenied => "room_access_denied",
			ErrorKind::UserNotFound => "user_not_found",
		};
		write!(f, "{s}")
	}
}

/// Client-facing error. Surfaced on the event channel rather than thrown
/// across the actor boundary, so application handlers cannot tear down a
/// long-lived connection.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
	pub kind: ErrorKind,
	pub message: String,
	pub context: Option<String>,
	/// Whether retrying the failed operation may succeed
	pub retry: bool,
	pub timestamp: DateTime<Utc>,
}

impl ClientError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			context: None,
			retry: matches!(kind, ErrorKind::ConnectionFailed | ErrorKind::NetworkError | ErrorKind::Timeout | ErrorKind::RateLimited),
			timestamp: Utc::now(),
		}
	}

	#[must_use]
	pub fn with_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}

	#[must_use]
	pub fn fatal(mut self) -> Self {
		self.retry = false;
		self
	}

	pub fn connection_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::ConnectionFailed, message)
	}

	pub fn auth_failed(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::AuthenticationFailed, message)
	}

	pub fn network(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::NetworkError, message)
	}

	pub fn timeout(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Timeout, message)
	}

	pub fn invalid_message(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidMessage, message)
	}

	pub fn queue_full(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::RateLimited, message)
	}

	pub fn server(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::ServerError, message)
	}
}

impl From<ws_messages::MessageError> for ClientError {
	fn from(err: ws_messages::MessageError) -> Self {
		Self::invalid_message(err.to_string())
	}
}

/// Resolution of a send call: delivered now, or parked for the next flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
	Sent,
	Queued,
}
