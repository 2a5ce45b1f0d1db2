//! Page route handlers.
//!
//! Handles `GET /` and `GET /{*path}`. Published pages are served from the
//! page store; a path missing from the store is rendered on the spot and
//! stored for later requests. Preview requests always render fresh and
//! bypass the store.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use sitefront_core::paths::RoutePath;

use crate::error::SiteError;
use crate::preview::PreviewMode;
use crate::render::{self, RenderOutcome};
use crate::state::{AppState, CachedPage};

/// Response header reporting how the page store handled the request.
pub const CACHE_STATUS_HEADER: &str = "x-sitefront-cache";

/// Browser-facing lifetime of a stored page without a revalidation period.
const IMMUTABLE_SECS: u64 = 31_536_000;

/// Handle `GET /`.
pub async fn index_page(
    State(state): State<AppState>,
    PreviewMode(preview): PreviewMode,
) -> Result<Response, SiteError> {
    serve_page(&state, RoutePath::default(), preview).await
}

/// Handle `GET /{*path}`.
pub async fn catchall_page(
    State(state): State<AppState>,
    Path(path): Path<String>,
    PreviewMode(preview): PreviewMode,
) -> Result<Response, SiteError> {
    serve_page(&state, RoutePath::from_slug(&path), preview).await
}

async fn serve_page(
    state: &AppState,
    route: RoutePath,
    preview: bool,
) -> Result<Response, SiteError> {
    let key = route.to_url_path();

    if preview {
        return match render::render_page(state, &route.segments, true).await? {
            RenderOutcome::Page(html) => Ok(build_response(html, preview_headers())),
            RenderOutcome::NotFound => Err(SiteError::NotFound(key)),
        };
    }

    if let Some(cached) = state.pages.get(&key).await {
        tracing::debug!(path = %key, "page store hit");
        metrics::counter!("page_store_hits_total").increment(1);
        let headers = published_headers(state, &cached, "HIT");
        return Ok(build_response(cached.html, headers));
    }

    tracing::debug!(path = %key, "page store miss, rendering");
    metrics::counter!("page_store_misses_total").increment(1);

    match render::render_page(state, &route.segments, false).await? {
        RenderOutcome::Page(html) => {
            let page = CachedPage::ok(html);
            let headers = published_headers(state, &page, "MISS");
            state.pages.insert(key, page.clone()).await;
            sitefront_core::metrics::set_gauge(
                "page_store_entries",
                state.pages.entry_count() as f64,
            );
            Ok(build_response(page.html, headers))
        }
        RenderOutcome::NotFound => Err(SiteError::NotFound(key)),
    }
}

/// Build an HTTP response with HTML content and security/cache headers.
fn build_response(html: String, cache_headers: HeaderMap) -> Response {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    // Security headers
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(render::components::CSP_HEADER),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    // ETag (xxHash of content)
    let hash = xxhash_rust::xxh3::xxh3_64(html.as_bytes());
    if let Ok(val) = HeaderValue::from_str(&format!("\"{hash:016x}\"")) {
        headers.insert(header::ETAG, val);
    }

    for (key, value) in cache_headers.iter() {
        headers.insert(key.clone(), value.clone());
    }

    (StatusCode::OK, headers, html).into_response()
}

/// Cache headers for published pages.
///
/// The CDN may serve a page until the revalidation period ends, then serve
/// it stale while fetching a fresh copy.
fn published_headers(
    state: &AppState,
    page: &CachedPage,
    cache_status: &'static str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let s_maxage = state
        .config
        .revalidate
        .map_or(IMMUTABLE_SECS, |ttl| ttl.as_secs());
    let value = format!("public, max-age=0, s-maxage={s_maxage}, stale-while-revalidate");
    if let Ok(val) = HeaderValue::from_str(&value) {
        headers.insert(header::CACHE_CONTROL, val);
    }
    let last_modified = page
        .rendered_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(val) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, val);
    }
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static(cache_status));

    headers
}

/// Cache headers for preview pages: never cached anywhere.
fn preview_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-cache, no-store, max-age=0, must-revalidate"),
    );
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static("BYPASS"));
    headers
}
