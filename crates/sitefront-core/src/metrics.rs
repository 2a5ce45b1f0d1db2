//! Prometheus metrics helpers for the site.
//!
//! Metrics are recorded through the `metrics` facade everywhere. Nothing is
//! exported unless a recorder is installed with [`init_metrics`] and served
//! with [`start_metrics_server`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use sitefront_core::metrics::{init_metrics, start_metrics_server};
//!
//! let handle = init_metrics()?;
//! start_metrics_server(9091, handle).await?;
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: subsystem (`graphql_`, `page_`, `preview_`, `prerender_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: `tier` (`public`/`preview`), `outcome`, `kind`

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Install the Prometheus recorder and register metric descriptions.
///
/// Fails if a recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_site_metrics();
    Ok(handle)
}

/// Like [`init_metrics`] but returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    init_metrics().ok()
}

/// Start the Prometheus metrics HTTP server.
///
/// Binds `0.0.0.0:port` and serves `/metrics` from a background task.
/// Bind failures are returned; later serve failures are logged.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Metrics server stopped: {}", e);
        }
    });

    Ok(())
}

fn register_site_metrics() {
    // =========================================================================
    // Content API
    // =========================================================================

    describe_counter!(
        "graphql_requests_total",
        "GraphQL requests sent to the content API (label: tier)"
    );
    describe_counter!(
        "graphql_errors_total",
        "Failed GraphQL requests (label: kind)"
    );
    describe_counter!(
        "graphql_cache_hits_total",
        "Queries answered from the normalized cache (label: tier)"
    );
    describe_counter!(
        "graphql_cache_misses_total",
        "Queries that went to the network (label: tier)"
    );

    // =========================================================================
    // Pages
    // =========================================================================

    describe_counter!(
        "page_renders_total",
        "Page renders (labels: outcome, tier)"
    );
    describe_histogram!("page_render_duration_seconds", "Time spent rendering a page");
    describe_counter!("page_store_hits_total", "Requests served from the page store");
    describe_counter!(
        "page_store_misses_total",
        "Requests rendered on demand because the page store had no entry"
    );
    describe_gauge!("page_store_entries", "Pages currently held in the page store");

    // =========================================================================
    // Preview
    // =========================================================================

    describe_counter!(
        "preview_sessions_total",
        "Preview sessions started with a valid token"
    );
    describe_counter!(
        "preview_rejections_total",
        "Preview requests rejected for a bad token"
    );

    // =========================================================================
    // Prerender
    // =========================================================================

    describe_counter!("prerender_pages_total", "Pages prerendered");
    describe_counter!("prerender_errors_total", "Pages that failed to prerender");
}

/// Increment a counter.
///
/// Convenience wrapper around `metrics::counter!`.
#[inline]
pub fn increment(name: &'static str, count: u64) {
    metrics::counter!(name).increment(count);
}

/// Set a gauge value.
#[inline]
pub fn set_gauge(name: &'static str, value: f64) {
    metrics::gauge!(name).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_metrics_init() {
        INIT.call_once(|| {
            let _ = try_init_metrics();
        });
    }

    #[test]
    fn test_try_init_metrics_idempotent() {
        let handle1 = try_init_metrics();
        let handle2 = try_init_metrics();

        // At most one should succeed
        assert!(handle1.is_none() || handle2.is_none());
    }

    #[test]
    fn test_increment_does_not_panic() {
        ensure_metrics_init();
        increment("test_counter", 0);
        increment("test_counter", 1);
        increment("test_counter", 100);
    }

    #[test]
    fn test_set_gauge_does_not_panic() {
        ensure_metrics_init();
        set_gauge("test_gauge", 0.0);
        set_gauge("test_gauge", 42.5);
    }

    #[test]
    fn test_register_site_metrics_does_not_panic() {
        ensure_metrics_init();
        register_site_metrics();
        register_site_metrics();
    }

    #[tokio::test]
    async fn test_metrics_server_binds_free_port() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let port = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };
        start_metrics_server(port, handle).await.unwrap();
    }
}
