pub mod availability;
pub mod bookings;
pub mod health;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/freelancers/:freelancer_id/availability",
            get(availability::get_day),
        )
        .route(
            "/api/freelancers/:freelancer_id/next-available",
            get(availability::get_next_available),
        )
        .route(
            "/api/freelancers/:freelancer_id/calendar",
            get(availability::get_calendar),
        )
        .route(
            "/api/freelancers/:freelancer_id/end-times",
            get(availability::get_end_times),
        )
        .route("/api/bookings", post(bookings::create_booking))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
