//! Heartbeat sender run by every monitored process
pub mod agent;
pub mod discovery;
pub mod transport;

pub use agent::FollowerAgent;
pub use discovery::ProcessIdentity;
pub use transport::{HeartbeatTransport, HttpTransport};
