//! API route modules.

pub mod health;
pub mod process;
pub mod upload;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/upload", upload::router(&state))
        .nest("/ws/process", process::router())
        .nest("/health", health::router())
        .with_state(state)
}
