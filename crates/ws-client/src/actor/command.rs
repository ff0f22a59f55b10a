use crate::actor::state::ConnectionInfo;
use crate::errors::{ClientError, SendOutcome};
use crate::metrics::PerformanceMetrics;
use crate::queue::Priority;
use crate::rooms::RoomSubscription;
use crate::router::HandlerFn;
use crate::transport::TransportLink;
use tokio::sync::oneshot;
use uuid::Uuid;
use ws_messages::{Envelope, MessageType};

/// Requests accepted by the connection actor
pub enum Command {
	Connect {
		respond_to: oneshot::Sender<Result<(), ClientError>>,
	},
	/// Explicit retry; resets the attempt counter and works even from the
	/// terminal `Closed` state.
	Reconnect {
		respond_to: oneshot::Sender<Result<(), ClientError>>,
	},
	Disconnect {
		respond_to: oneshot::Sender<()>,
	},
	Shutdown {
		respond_to: oneshot::Sender<()>,
	},
	Send {
		envelope: Envelope,
		priority: Priority,
		respond_to: oneshot::Sender<Result<SendOutcome, ClientError>>,
	},
	JoinRoom {
		room: String,
		respond_to: oneshot::Sender<bool>,
	},
	LeaveRoom {
		room: String,
		respond_to: oneshot::Sender<bool>,
	},
	Rooms {
		respond_to: oneshot::Sender<Vec<RoomSubscription>>,
	},
	Subscribe {
		types: Vec<MessageType>,
		room: Option<String>,
		once: bool,
		handler: HandlerFn,
		respond_to: oneshot::Sender<Uuid>,
	},
	Unsubscribe {
		id: Uuid,
		respond_to: oneshot::Sender<bool>,
	},
	Info {
		respond_to: oneshot::Sender<ConnectionInfo>,
	},
	Metrics {
		respond_to: oneshot::Sender<PerformanceMetrics>,
	},
	ResetMetrics,
	Internal(Internal),
}

/// Events the actor sends itself from spawned timer and dial tasks.
/// Generation tags make cancelled handshakes inert: a stale outcome or
/// timeout is simply dropped.
pub enum Internal {
	ConnectOutcome {
		generation: u64,
		result: Result<TransportLink, ClientError>,
	},
	AuthTimeout {
		generation: u64,
	},
	RetryTick {
		generation: u64,
	},
	JoinTimeout {
		room: String,
		generation: u64,
	},
	LeaveTimeout {
		room: String,
		generation: u64,
	},
}
