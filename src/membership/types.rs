use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invariant_error;

/// Confidence values are kept on a fixed grid so repeated `+step`/`-step`
/// arithmetic lands exactly on the failure point instead of a hair above it.
const CONFIDENCE_RESOLUTION: f64 = 1e9;

pub(crate) fn quantize(value: f64) -> f64 {
    (value * CONFIDENCE_RESOLUTION).round() / CONFIDENCE_RESOLUTION
}

/// Identity of a monitored process
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessKey {
    address: String,
    process_id: i64,
}

impl ProcessKey {
    pub fn new(address: impl Into<String>, process_id: i64) -> Self {
        Self {
            address: address.into(),
            process_id,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn process_id(&self) -> i64 {
        self.process_id
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.process_id)
    }
}

/// Result of applying one decay step to a record
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decay {
    /// Decremented confidence was persisted
    Retained(f64),
    /// Decremented confidence reached the failure point; the record must go
    Evicted(f64),
}

/// Liveness state of one process. Only the table's mutators touch it.
#[derive(Clone, Debug, PartialEq)]
pub struct MembershipRecord {
    confidence: f64,
    last_heartbeat_at: i64,
}

impl MembershipRecord {
    pub fn new(confidence: f64, last_heartbeat_at: i64) -> Self {
        Self {
            confidence: quantize(confidence.clamp(0.0, 1.0)),
            last_heartbeat_at,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn last_heartbeat_at(&self) -> i64 {
        self.last_heartbeat_at
    }

    /// Register a heartbeat: confidence goes up by `step`, capped at 1.0.
    ///
    /// `last_heartbeat_at` never moves backwards, so a delayed heartbeat
    /// still counts towards confidence but cannot make the record look older.
    pub fn raise(&mut self, step: f64, timestamp: i64) -> f64 {
        self.confidence = quantize((self.confidence + step).min(1.0));
        self.last_heartbeat_at = self.last_heartbeat_at.max(timestamp);
        self.confidence
    }

    /// Seconds since the last heartbeat as seen from `now`
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_heartbeat_at)
    }

    pub fn is_stale(&self, now: i64, staleness_threshold_secs: u64) -> bool {
        let threshold = i64::try_from(staleness_threshold_secs).unwrap_or(i64::MAX);
        self.age(now) >= threshold
    }

    /// Lower confidence by `step`. A result at or below `failure_point` is
    /// never stored: the caller removes the record instead.
    pub fn decay(&mut self, step: f64, failure_point: f64) -> Decay {
        let decremented = quantize(self.confidence - step);
        if decremented <= failure_point {
            Decay::Evicted(decremented)
        } else {
            self.confidence = decremented;
            Decay::Retained(decremented)
        }
    }

    pub fn check_invariants(&self, key: &ProcessKey, failure_point: f64) -> Result<()> {
        if !self.confidence.is_finite()
            || self.confidence > 1.0
            || self.confidence <= failure_point
        {
            return Err(invariant_error!(
                "record {} holds confidence {} outside ({}, 1.0]",
                key,
                self.confidence,
                failure_point
            ));
        }
        Ok(())
    }
}

/// One row of the exported table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MembershipRow {
    pub address: String,
    pub process_id: i64,
    pub confidence: f64,
    pub last_heartbeat_at: i64,
}

/// Read-only view of the table handed to presentation collaborators.
/// Rows are in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub rows: Vec<MembershipRow>,
    pub active_process_count: usize,
}

impl MembershipSnapshot {
    pub fn find(&self, address: &str, process_id: i64) -> Option<&MembershipRow> {
        self.rows
            .iter()
            .find(|row| row.address == address && row.process_id == process_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_caps_at_one() {
        let mut record = MembershipRecord::new(0.5, 1000);
        assert_eq!(record.raise(0.1, 1010), 0.6);
        for ts in 1011..1020 {
            record.raise(0.1, ts);
        }
        assert_eq!(record.confidence(), 1.0);
        assert_eq!(record.last_heartbeat_at(), 1019);
    }

    #[test]
    fn test_raise_never_rewinds_timestamp() {
        let mut record = MembershipRecord::new(0.5, 1000);
        record.raise(0.1, 990);
        assert_eq!(record.last_heartbeat_at(), 1000);
        assert_eq!(record.confidence(), 0.6);
    }

    #[test]
    fn test_decay_lands_exactly_on_failure_point() {
        let mut record = MembershipRecord::new(0.5, 0);
        assert_eq!(record.decay(0.1, 0.2), Decay::Retained(0.4));
        assert_eq!(record.decay(0.1, 0.2), Decay::Retained(0.3));
        assert_eq!(record.decay(0.1, 0.2), Decay::Evicted(0.2));
        // an evicting decay leaves the stored value alone
        assert_eq!(record.confidence(), 0.3);
    }

    #[test]
    fn test_staleness_is_inclusive() {
        let record = MembershipRecord::new(0.5, 1000);
        assert!(!record.is_stale(1014, 15));
        assert!(record.is_stale(1015, 15));
        assert!(record.is_stale(1016, 15));
        assert!(!record.is_stale(900, 15));
    }

    #[test]
    fn test_invariants() {
        let key = ProcessKey::new("10.0.0.5", 100);
        assert!(MembershipRecord::new(0.5, 0)
            .check_invariants(&key, 0.2)
            .is_ok());
        assert!(MembershipRecord::new(0.2, 0)
            .check_invariants(&key, 0.2)
            .is_err());

        let mut corrupt = MembershipRecord::new(0.5, 0);
        corrupt.confidence = f64::NAN;
        let err = corrupt.check_invariants(&key, 0.2).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ProcessKey::new("10.0.0.5", 100).to_string(), "10.0.0.5/100");
    }
}
