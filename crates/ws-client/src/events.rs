use crate::actor::state::{ConnectionInfo, ConnectionState};
use crate::errors::ClientError;
use ws_messages::MessageId;

/// Lifecycle and error notifications, fanned out on a broadcast channel
/// with overflow enabled so a slow listener can never wedge the actor.
#[derive(Debug, Clone)]
pub enum ClientEvent {
	StateChanged { new: ConnectionState, old: ConnectionState },
	Connected(ConnectionInfo),
	Disconnected(ConnectionInfo),
	/// Transport, protocol, or handler error. Reported, never thrown.
	Error(ClientError),
	/// A queued message exhausted its attempts and was dropped
	SendFailed { id: MessageId, error: ClientError },
	/// Automatic reconnection gave up after `attempts` tries. The state is
	/// terminal (`Closed`); only an explicit `reconnect` revives the
	/// connection.
	ReconnectExhausted { attempts: u32 },
}
