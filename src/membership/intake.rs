//! Heartbeat intake: upserts one record per received heartbeat
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::table::{MembershipStore, Upsert};
use super::types::MembershipRecord;
use crate::error::Result;
use crate::heartbeat::HeartbeatMessage;
use crate::presentation::Presenter;
use crate::settings::DetectorSettings;

/// Confidence adjustments applied on intake
#[derive(Clone, Copy, Debug)]
pub struct IntakePolicy {
    pub initial_confidence: f64,
    pub confidence_step: f64,
}

impl From<&DetectorSettings> for IntakePolicy {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            initial_confidence: settings.initial_confidence,
            confidence_step: settings.confidence_step,
        }
    }
}

pub struct HeartbeatIntake<S> {
    store: Arc<S>,
    policy: IntakePolicy,
    presenter: Arc<dyn Presenter>,
}

impl<S> Clone for HeartbeatIntake<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
            presenter: self.presenter.clone(),
        }
    }
}

impl<S: MembershipStore> HeartbeatIntake<S> {
    pub fn new(store: Arc<S>, policy: IntakePolicy, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            store,
            policy,
            presenter,
        }
    }

    /// Record a heartbeat and return it unchanged as the acknowledgment.
    ///
    /// A heartbeat without an address is rejected and leaves the table as it was.
    pub fn intake(&self, heartbeat: HeartbeatMessage) -> Result<HeartbeatMessage> {
        if let Err(err) = heartbeat.validate() {
            warn!(
                "Rejected heartbeat for pid {}: {}",
                heartbeat.process_id, err
            );
            return Err(err);
        }
        debug!(
            "Received heartbeat from process with IP {} and PID {}",
            heartbeat.address, heartbeat.process_id
        );

        let policy = self.policy;
        let timestamp = heartbeat.timestamp;
        let mut confidence = policy.initial_confidence;
        let outcome = self.store.upsert(
            heartbeat.key(),
            || MembershipRecord::new(policy.initial_confidence, timestamp),
            |record| confidence = record.raise(policy.confidence_step, timestamp),
        );

        match outcome {
            Upsert::Inserted => info!(
                "New process {}/{} joined, total number of connected processes {}",
                heartbeat.address,
                heartbeat.process_id,
                self.store.len()
            ),
            Upsert::Updated => debug!(
                "Process {}/{} confidence raised to {:.2}",
                heartbeat.address, heartbeat.process_id, confidence
            ),
        }

        if self.presenter.enabled() {
            self.presenter.refresh(self.store.snapshot());
        }
        Ok(heartbeat)
    }
}
