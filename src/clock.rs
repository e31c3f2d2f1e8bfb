//! Wall clock in unix seconds, swappable in tests
use std::sync::Arc;

use chrono::Utc;

/// Source of "now" in unix seconds
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp())
}

pub fn fixed_clock(now: i64) -> Clock {
    Arc::new(move || now)
}
