use axum::extract::State;
use axum::Json;
use tracing::instrument;

use super::state::AppState;
use crate::membership::{MembershipSnapshot, MembershipStore};

/// Current table rows in insertion order plus the active process count
#[instrument(skip(state), level = "debug")]
pub async fn membership(State(state): State<AppState>) -> Json<MembershipSnapshot> {
    Json(state.table.snapshot())
}
