pub mod actor;
pub mod config;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod queue;
pub mod rooms;
pub mod router;
pub mod transport;

pub use actor::{ClientHandle, ConnectionInfo, ConnectionState};
pub use config::ClientConfig;
pub use errors::{ClientError, ErrorKind, SendOutcome};
pub use events::ClientEvent;
pub use metrics::PerformanceMetrics;
pub use queue::Priority;
pub use rooms::RoomSubscription;
pub use transport::{Transport, TransportFrame, TransportLink};
