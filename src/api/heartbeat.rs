use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{instrument, warn};

use super::state::AppState;
use crate::error::Result;
use crate::heartbeat::HeartbeatMessage;
use crate::invalid_request;

/// `SendHeartBeat`: record the heartbeat and echo it back
#[instrument(skip(state, payload), level = "debug")]
pub async fn send_heartbeat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<HeartbeatMessage>, JsonRejection>,
) -> Result<Json<HeartbeatMessage>> {
    let Json(heartbeat) = payload.map_err(|rejection| {
        warn!("Rejected undecodable heartbeat: {}", rejection.body_text());
        invalid_request!(rejection.body_text())
    })?;
    state.intake.intake(heartbeat).map(Json)
}
