//! Error types for the site service.
//!
//! Page errors are rendered as simple HTML error pages. The preview API
//! answers with JSON.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maud::{DOCTYPE, html};
use serde_json::json;

/// Site service error type.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// The preview secret was missing or wrong.
    #[error("invalid preview token")]
    Unauthorized,

    /// No page with a title exists for the requested slug.
    #[error("not found: {0}")]
    NotFound(String),

    /// The content API failed.
    #[error("content API error: {0}")]
    Upstream(#[from] sitefront_core::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            Self::Unauthorized => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Invalid token" })),
                )
                    .into_response();
            }
            Self::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "404",
                "This page could not be found.".to_string(),
            ),
            Self::Upstream(err) => {
                tracing::error!(error = %err, "content API error");
                (
                    StatusCode::BAD_GATEWAY,
                    "Service Unavailable",
                    "Content is temporarily unavailable. Please try again later.".to_string(),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Error",
                    "An internal error occurred. Please try again later.".to_string(),
                )
            }
        };

        (status, error_page(title, &message)).into_response()
    }
}

/// Standalone error page.
pub fn error_page(title: &str, message: &str) -> maud::Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                meta name="robots" content="noindex";
                style { (maud::PreEscaped(crate::render::components::ERROR_CSS)) }
            }
            body {
                main class="error-page" {
                    h1 { (title) }
                    p { (message) }
                    a href="/" { "Back to home" }
                }
            }
        }
    }
}
