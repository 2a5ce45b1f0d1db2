//! Application state shared across all request handlers.

use std::sync::Arc;

use moka::future::Cache;
use sitefront_core::ContentSource;

use crate::config::Config;

/// A rendered page held in the page store.
#[derive(Clone, Debug)]
pub struct CachedPage {
    /// Rendered HTML string.
    pub html: String,
    /// When this page was rendered; sent as `Last-Modified`.
    pub rendered_at: chrono::DateTime<chrono::Utc>,
}

impl CachedPage {
    /// A successfully rendered page, stamped now.
    pub fn ok(html: String) -> Self {
        Self {
            html,
            rendered_at: chrono::Utc::now(),
        }
    }
}

/// Rendered pages keyed by URL path (`/`, `/about`, `/blog/post`).
pub type PageStore = Cache<String, CachedPage>;

/// Page store capacity (number of pages).
const PAGE_STORE_CAPACITY: u64 = 10_000;

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Page data source.
    pub source: Arc<dyn ContentSource>,

    /// Application configuration.
    pub config: Arc<Config>,

    /// Published pages rendered at startup or on first request.
    pub pages: PageStore,
}

impl AppState {
    /// Create a new application state from configuration and a content source.
    pub fn new(config: Config, source: Arc<dyn ContentSource>) -> Self {
        let mut builder = Cache::builder().max_capacity(PAGE_STORE_CAPACITY);
        if let Some(ttl) = config.revalidate {
            builder = builder.time_to_live(ttl);
        }
        let pages = builder.build();

        tracing::info!(
            page_store_capacity = PAGE_STORE_CAPACITY,
            revalidate_secs = config.revalidate.map(|d| d.as_secs()),
            "application state initialized"
        );

        Self {
            source,
            config: Arc::new(config),
            pages,
        }
    }
}
