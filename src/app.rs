use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/increment", post(handlers::increment_form))
        .route("/api/today", get(handlers::get_today))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/calendar", get(handlers::get_calendar))
        .route("/api/increment", post(handlers::increment))
        .route("/api/session", get(handlers::get_session))
        .route("/api/session/sign-in", post(handlers::sign_in))
        .route("/api/session/sign-out", post(handlers::sign_out))
        .with_state(state)
}
