use std::fmt;
use std::time::{Duration, Instant};

/// Connection lifecycle state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
	/// Initial state, and the result of an explicit `disconnect`
	Disconnected,
	/// Transport dial and auth handshake in progress
	Connecting,
	Connected,
	/// Waiting for the next scheduled retry after an unexpected close
	Reconnecting,
	/// A connect attempt failed; retry may be scheduled
	Error,
	/// Terminal: explicit shutdown or reconnect attempts exhausted
	Closed,
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ConnectionState::Disconnected => "disconnected",
			ConnectionState::Connecting => "connecting",
			ConnectionState::Connected => "connected",
			ConnectionState::Reconnecting => "reconnecting",
			ConnectionState::Error => "error",
			ConnectionState::Closed => "closed",
		};
		write!(f, "{s}")
	}
}

/// Read-only snapshot of the logical connection. Mutated exclusively by the
/// actor; handles receive clones.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
	pub state: ConnectionState,
	pub connected_at: Option<Instant>,
	pub last_ping_time: Option<Instant>,
	pub last_pong_time: Option<Instant>,
	/// Reset to 0 on every successful connect
	pub reconnect_attempts: u32,
	/// Most recent ping round-trip
	pub latency: Option<Duration>,
	pub is_authenticated: bool,
	pub user_id: Option<String>,
}

impl ConnectionInfo {
	#[must_use]
	pub fn new() -> Self {
		Self {
			state: ConnectionState::Disconnected,
			connected_at: None,
			last_ping_time: None,
			last_pong_time: None,
			reconnect_attempts: 0,
			latency: None,
			is_authenticated: false,
			user_id: None,
		}
	}

	#[must_use]
	pub fn uptime(&self) -> Option<Duration> {
		self.connected_at.map(|t| t.elapsed())
	}

	/// Clear per-session fields when the transport goes away
	pub fn reset_session(&mut self) {
		self.connected_at = None;
		self.last_ping_time = None;
		self.last_pong_time = None;
		self.latency = None;
		self.is_authenticated = false;
	}
}

impl Default for ConnectionInfo {
	fn default() -> Self {
		Self::new()
	}
}
