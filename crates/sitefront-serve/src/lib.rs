//! sitefront - server-rendered pages for a Contentful space.
//!
//! Every page entry in the CMS is served at its slug. Published pages are
//! prerendered at startup and kept in an in-memory page store; pages created
//! later are rendered on their first request and stored from then on.
//! Editors can switch to preview mode to see draft content, which is always
//! rendered fresh and never stored.
//!
//! # Architecture
//!
//! - **Content**: `sitefront_core` fetches pages over GraphQL through a normalized cache
//! - **Render**: Generates HTML with maud (compile-time templates)
//! - **Store**: moka page store + Cache-Control headers for CDN caching
//! - **Preview**: HMAC-signed cookie toggled by `/api/preview` and `/api/exit-preview`
//!
//! # Security
//!
//! - All dynamic content is HTML-escaped by maud
//! - Preview cookies are HttpOnly and signed; forged cookies are ignored
//! - X-Frame-Options: DENY prevents clickjacking

pub mod config;
pub mod error;
pub mod prerender;
pub mod preview;
pub mod render;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
