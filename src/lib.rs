pub mod api;
pub mod cli;
pub mod clock;
pub mod error;
pub mod follower;
pub mod heartbeat;
pub mod membership;
pub mod presentation;
pub mod settings;
