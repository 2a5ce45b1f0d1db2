//! Route definitions for the site service.
//!
//! ## Routes
//!
//! - `GET /health` - Health check (JSON)
//! - `GET /api/preview` - Enter preview mode and redirect to the slug
//! - `GET /api/exit-preview` - Leave preview mode and redirect to the slug
//! - `GET /` - Index page
//! - `GET /{*path}` - Any other page

mod health;
pub mod page;
pub mod preview;

use axum::Router;
use axum::routing::get;

use crate::state::AppState;

/// Build the complete site router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/preview", get(preview::enter_preview))
        .route("/api/exit-preview", get(preview::exit_preview))
        .route("/", get(page::index_page))
        .route("/{*path}", get(page::catchall_page))
        .with_state(state)
}
