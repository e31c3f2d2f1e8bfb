use std::sync::Arc;

use crate::membership::{HeartbeatIntake, IntakePolicy, MembershipTable};
use crate::presentation::Presenter;
use crate::settings::DetectorSettings;

/// Shared by every request: the intake handler and a read handle on the table
#[derive(Clone)]
pub struct AppState {
    pub intake: HeartbeatIntake<MembershipTable>,
    pub table: Arc<MembershipTable>,
}

impl AppState {
    pub fn new(
        table: Arc<MembershipTable>,
        detector: &DetectorSettings,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            intake: HeartbeatIntake::new(table.clone(), IntakePolicy::from(detector), presenter),
            table,
        }
    }
}
