//! Static prerendering.
//!
//! Resolves the published routes and renders each one, either into the
//! page store (before serving) or to HTML files on disk (`build`).

use std::path::{Component, Path, PathBuf};

use futures::StreamExt;
use sitefront_core::fs::write_file_create_dirs;
use sitefront_core::paths::{RoutePath, resolve_static_paths};

use crate::error::SiteError;
use crate::render::{self, RenderOutcome};
use crate::state::{AppState, CachedPage};

/// Routes rendered at the same time.
const PRERENDER_CONCURRENCY: usize = 8;

/// Counts from a prerender run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrerenderReport {
    /// Routes rendered successfully.
    pub rendered: usize,
    /// Routes whose page is missing or has no SEO title.
    pub not_found: usize,
    /// Routes that failed to render or write.
    pub failed: usize,
}

impl PrerenderReport {
    fn record<T>(&mut self, route: &RoutePath, result: &Result<Option<T>, SiteError>) {
        match result {
            Ok(Some(_)) => {
                self.rendered += 1;
                sitefront_core::metrics::increment("prerender_pages_total", 1);
            }
            Ok(None) => self.not_found += 1,
            Err(e) => {
                self.failed += 1;
                sitefront_core::metrics::increment("prerender_errors_total", 1);
                tracing::warn!(path = %route.to_url_path(), error = %e, "prerender failed");
            }
        }
    }
}

/// Render every resolved route; `None` marks a route with no renderable page.
async fn render_routes(
    state: &AppState,
) -> Vec<(RoutePath, Result<Option<String>, SiteError>)> {
    let resolved = resolve_static_paths(state.source.as_ref()).await;

    futures::stream::iter(resolved.paths)
        .map(|route| async move {
            let outcome = render::render_page(state, &route.segments, false)
                .await
                .map(|outcome| match outcome {
                    RenderOutcome::Page(html) => Some(html),
                    RenderOutcome::NotFound => None,
                });
            (route, outcome)
        })
        .buffer_unordered(PRERENDER_CONCURRENCY)
        .collect()
        .await
}

/// Prerender every published route into the page store.
pub async fn warm_page_store(state: &AppState) -> PrerenderReport {
    let mut report = PrerenderReport::default();

    for (route, result) in render_routes(state).await {
        report.record(&route, &result);
        if let Ok(Some(html)) = result {
            state
                .pages
                .insert(route.to_url_path(), CachedPage::ok(html))
                .await;
        }
    }

    sitefront_core::metrics::set_gauge("page_store_entries", report.rendered as f64);
    tracing::info!(
        rendered = report.rendered,
        not_found = report.not_found,
        failed = report.failed,
        "page store warmed"
    );
    report
}

/// Prerender every published route to `<out_dir>/<slug>/index.html`.
pub async fn build_site(state: &AppState, out_dir: &Path) -> PrerenderReport {
    let mut report = PrerenderReport::default();

    for (route, result) in render_routes(state).await {
        let result = match result {
            Ok(Some(html)) => match output_path(out_dir, &route) {
                Some(path) => write_file_create_dirs(&path, html)
                    .await
                    .map(|()| Some(path))
                    .map_err(|e| SiteError::Internal(anyhow::Error::new(e).context("writing page"))),
                None => Err(SiteError::Internal(anyhow::anyhow!(
                    "route {} escapes the output directory",
                    route.to_url_path()
                ))),
            },
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        if let Ok(Some(path)) = &result {
            tracing::debug!(path = %path.display(), "wrote page");
        }
        report.record(&route, &result);
    }

    tracing::info!(
        out_dir = %out_dir.display(),
        rendered = report.rendered,
        not_found = report.not_found,
        failed = report.failed,
        "site built"
    );
    report
}

/// Output file for a route: `index.html` at the root for the index route,
/// `<segments>/index.html` otherwise.
///
/// Returns `None` when a segment is not a plain file name (`..`, `.`, a
/// root or a drive prefix).
pub fn output_path(out_dir: &Path, route: &RoutePath) -> Option<PathBuf> {
    let mut path = out_dir.to_path_buf();
    if !route.is_index() {
        for segment in &route.segments {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) => path.push(name),
                _ => return None,
            }
        }
    }
    Some(path.join("index.html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_support::{FakeSource, page, shared_state, test_state};

    #[test]
    fn output_paths() {
        let out = Path::new("out");
        assert_eq!(
            output_path(out, &RoutePath::from_slug("index")),
            Some(PathBuf::from("out/index.html"))
        );
        assert_eq!(
            output_path(out, &RoutePath::from_slug("blog/post")),
            Some(PathBuf::from("out/blog/post/index.html"))
        );
    }

    #[test]
    fn output_paths_reject_traversal() {
        let out = Path::new("out");
        for slug in ["../escaped", "a/../../b", "./x", "a/.."] {
            assert_eq!(output_path(out, &RoutePath::from_slug(slug)), None, "{slug}");
        }
    }

    #[tokio::test]
    async fn build_never_writes_outside_out_dir() {
        let root = tempfile::tempdir().unwrap();
        let out_dir = root.path().join("out");
        let state = test_state(FakeSource::with_pages(vec![
            page("about", Some("About")),
            page("../escaped", Some("Escaped")),
        ]));

        let report = build_site(&state, &out_dir).await;

        assert_eq!(report.rendered, 1);
        assert_eq!(report.failed, 1);
        assert!(out_dir.join("about/index.html").exists());
        assert!(!root.path().join("escaped").exists());
    }

    #[tokio::test]
    async fn warms_store_with_renderable_pages() {
        let state = test_state(FakeSource::with_pages(vec![
            page("index", Some("Home")),
            page("about", Some("About")),
            page("draft", None),
        ]));

        let report = warm_page_store(&state).await;

        assert_eq!(
            report,
            PrerenderReport {
                rendered: 2,
                not_found: 1,
                failed: 0
            }
        );
        assert!(state.pages.get("/").await.is_some());
        assert!(state.pages.get("/about").await.is_some());
        assert!(state.pages.get("/draft").await.is_none());
    }

    #[tokio::test]
    async fn warmed_pages_serve_without_fetching() {
        let source = Arc::new(FakeSource::with_pages(vec![page("about", Some("About"))]));
        let state = shared_state(source.clone());

        warm_page_store(&state).await;
        let calls = source.collection_calls();

        let app = crate::routes::router(state);
        let response = tower::ServiceExt::oneshot(
            app,
            axum::http::Request::builder()
                .uri("/about")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(source.collection_calls(), calls);
    }

    #[tokio::test]
    async fn failed_resolution_renders_nothing() {
        let state = test_state(FakeSource::failing());
        assert_eq!(warm_page_store(&state).await, PrerenderReport::default());
    }

    #[tokio::test]
    async fn builds_html_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(FakeSource::with_pages(vec![
            page("index", Some("Home")),
            page("blog/post", Some("Post")),
        ]));

        let report = build_site(&state, dir.path()).await;

        assert_eq!(report.rendered, 2);
        let index = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(index.contains("<title>Home</title>"));
        let post = std::fs::read_to_string(dir.path().join("blog/post/index.html")).unwrap();
        assert!(post.contains("<title>Post</title>"));
    }
}
