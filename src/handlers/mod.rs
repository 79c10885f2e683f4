pub mod admin;
pub mod bookings;
pub mod calendar;
pub mod health;
pub mod slots;

use std::sync::Arc;

use anyhow::anyhow;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/slots", get(slots::list_slots))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/calendar/:booking_id", get(calendar::download_ics))
        .route("/api/admin/bookings", get(admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            patch(admin::update_booking_status),
        )
        .route("/api/admin/slots", post(admin::create_slots))
        .route("/api/admin/slots/:id", delete(admin::delete_slot))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs store work off the async runtime; transactions hold a lock and
/// credential hashing is CPU-bound.
async fn run_blocking<T, F>(state: &Arc<AppState>, f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> AppResult<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| AppError::Internal(anyhow!("blocking task failed: {e}")))?
}
