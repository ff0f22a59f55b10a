use std::time::Duration;

/// Construction-time configuration for one logical connection.
///
/// Everything has a default so callers can use struct-update syntax:
///
/// ```rust
/// use ws_client::ClientConfig;
///
/// let config = ClientConfig {
/// 	url: "ws://localhost".to_string(),
/// 	port: Some(8080),
/// 	auth_token: Some("opaque".to_string()),
/// 	..ClientConfig::default()
/// };
/// assert_eq!(config.endpoint(), "ws://localhost:8080");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
	pub url: String,
	pub port: Option<u16>,
	pub protocols: Vec<String>,
	/// Fixed delay between reconnect attempts. Deliberately linear, not
	/// exponential.
	pub reconnect_interval: Duration,
	pub max_reconnect_attempts: u32,
	pub heartbeat_interval: Duration,
	/// Bounds the transport dial, the auth round-trip, and room join/leave
	/// acks.
	pub connection_timeout: Duration,
	pub message_queue_size: usize,
	/// Gates per-frame debug logging only; lifecycle logging is always on.
	pub enable_logging: bool,
	/// Opaque token forwarded in the auth handshake. When set, the
	/// connection is not `Connected` until the server acks with
	/// `auth_success`.
	pub auth_token: Option<String>,
	pub auto_reconnect: bool,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			url: "ws://localhost".to_string(),
			port: None,
			protocols: Vec::new(),
			reconnect_interval: Duration::from_millis(5000),
			max_reconnect_attempts: 10,
			heartbeat_interval: Duration::from_millis(30_000),
			connection_timeout: Duration::from_millis(10_000),
			message_queue_size: 1000,
			enable_logging: false,
			auth_token: None,
			auto_reconnect: true,
		}
	}
}

impl ClientConfig {
	/// Endpoint string handed to the transport
	#[must_use]
	pub fn endpoint(&self) -> String {
		match self.port {
			Some(port) => format!("{}:{}", self.url, port),
			None => self.url.clone(),
		}
	}
}
