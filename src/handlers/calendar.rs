use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

use super::run_blocking;

// GET /calendar/:booking_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    // Strip .ics suffix if present
    let raw = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);
    let booking_id: i64 = raw
        .parse()
        .map_err(|_| AppError::NotFound(format!("booking {raw}")))?;

    let (booking, slot) = run_blocking(&state, move |s| s.workflow.get_booking(booking_id)).await?;
    let slot = slot.ok_or_else(|| AppError::NotFound(format!("booking {booking_id} has no slot")))?;

    let ics = generate_ics(
        &booking,
        &slot,
        &state.config.business_name,
        state.config.appointment_minutes,
    );
    let filename = format!("booking-{booking_id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
