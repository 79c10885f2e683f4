use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::errors::AppError;
use crate::models::{Booking, CreateBookingRequest};
use crate::state::AppState;

use super::run_blocking;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = run_blocking(&state, move |s| s.workflow.create_booking(&body)).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
