//! Membership table and its two mutators: heartbeat intake and the decay sweep
pub mod intake;
pub mod sweeper;
pub mod table;
pub mod types;

pub use intake::{HeartbeatIntake, IntakePolicy};
pub use sweeper::{DecaySweeper, SweepPolicy, SweepReport, SweeperHandle};
pub use table::{MembershipStore, MembershipTable, Upsert, Visit};
pub use types::{Decay, MembershipRecord, MembershipRow, MembershipSnapshot, ProcessKey};
