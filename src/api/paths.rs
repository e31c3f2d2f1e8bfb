//! All Paths are recorded here for use throughout this codebase
pub mod base {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const ABOUT: &str = "/about";
}

pub mod rpc {
    pub const SEND_HEARTBEAT: &str = "/rpc/SendHeartBeat";
}

pub const MEMBERSHIP: &str = "/membership";

pub fn drop_leading_slash(path: &str) -> &str {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped
    } else {
        path
    }
}
