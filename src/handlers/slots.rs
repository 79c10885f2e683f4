use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use crate::errors::AppError;
use crate::models::{SlotFilter, SlotView};
use crate::state::AppState;

use super::run_blocking;

// GET /api/slots?date=&from=&to=&status=
// status: Available | Full | Outdated, also all lower or all upper case
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SlotFilter>,
) -> Result<Json<Vec<SlotView>>, AppError> {
    let slots = run_blocking(&state, move |s| {
        Ok(s.workflow.list_slots_with_status(&filter)?.collect::<Vec<SlotView>>())
    })
    .await?;
    Ok(Json(slots))
}
