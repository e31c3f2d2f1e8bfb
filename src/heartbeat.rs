//! Heartbeat wire message exchanged between followers and the coordinator
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invalid_request;
use crate::membership::ProcessKey;

/// Body of a `SendHeartBeat` call; the coordinator answers with the same value.
///
/// `address` defaults to empty when missing so that an absent address is
/// reported as an invalid request rather than a decoding failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatMessage {
    #[serde(default)]
    pub address: String,
    pub process_id: i64,
    /// Unix epoch seconds, as stamped by the sender
    pub timestamp: i64,
}

impl HeartbeatMessage {
    pub fn new(address: impl Into<String>, process_id: i64, timestamp: i64) -> Self {
        Self {
            address: address.into(),
            process_id,
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(invalid_request!("heartbeat address must not be empty"));
        }
        Ok(())
    }

    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.address.clone(), self.process_id)
    }
}
