use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Slot, UpdateStatusRequest};
use crate::state::AppState;

use super::run_blocking;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = query
        .status
        .as_deref()
        .map(|s| BookingStatus::parse(s).ok_or_else(|| AppError::Validation(format!("unknown status: {s}"))))
        .transpose()?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let bookings = run_blocking(&state, move |s| s.workflow.list_bookings(status, limit)).await?;
    Ok(Json(bookings))
}

// PATCH /api/admin/bookings/:id/status
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = BookingStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("unknown status: {}", body.status)))?;

    let booking = run_blocking(&state, move |s| s.workflow.update_status(id, status)).await?;
    Ok(Json(booking))
}

// POST /api/admin/slots
#[derive(Deserialize)]
pub struct CreateSlotsRequest {
    pub date: NaiveDate,
    pub times: Vec<String>,
    pub capacity: i64,
}

pub async fn create_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateSlotsRequest>,
) -> Result<(StatusCode, Json<Vec<Slot>>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let slots = run_blocking(&state, move |s| {
        s.workflow.create_slots(body.date, &body.times, body.capacity)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(slots)))
}

// DELETE /api/admin/slots/:id
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    run_blocking(&state, move |s| s.workflow.delete_slot(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
