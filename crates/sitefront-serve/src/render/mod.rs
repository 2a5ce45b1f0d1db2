//! HTML rendering for CMS pages.
//!
//! A page is looked up by slug in the full page collection and rendered
//! with its SEO head and content blocks. Pages without an SEO title are
//! treated as missing.
//!
//! All rendering uses [maud](https://maud.lambda.xyz/) for compile-time HTML
//! generation with automatic XSS protection (all dynamic values are escaped).

pub mod components;
pub mod head;

use std::time::Instant;

use maud::{Markup, html};
use sitefront_core::paths::{INDEX_SLUG, RoutePath, normalize_slug, page_slug};
use sitefront_core::{HeadConfig, Page};

use crate::error::SiteError;
use crate::state::AppState;

/// Result of rendering a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A complete HTML document.
    Page(String),
    /// No page (or no page with an SEO title) exists for the slug.
    NotFound,
}

/// Render the page for catch-all route segments.
///
/// Fetches the whole page collection for the requested tier and picks the
/// entry with a matching slug. Content API failures are returned as errors.
pub async fn render_page(
    state: &AppState,
    segments: &[String],
    preview: bool,
) -> Result<RenderOutcome, SiteError> {
    let started = Instant::now();
    let slug = page_slug(segments);
    let tier = sitefront_core::client::tier_label(preview);

    let collection = state.source.page_collection(preview).await?;

    let outcome = match collection.find_by_slug(&slug) {
        Some(page) if page.seo_title().is_some() => {
            let snapshot = state.source.page_collection_snapshot(preview);
            let url_path = RoutePath::from_slug(&slug).to_url_path();
            let markup = page_document(page, &url_path, &state.config.head, preview);
            RenderOutcome::Page(
                components::page_shell(markup.head, markup.body, snapshot.as_ref(), preview)
                    .into_string(),
            )
        }
        _ => {
            tracing::debug!(slug = %slug, preview, "no renderable page for slug");
            RenderOutcome::NotFound
        }
    };

    let label = match outcome {
        RenderOutcome::Page(_) => "page",
        RenderOutcome::NotFound => "not_found",
    };
    metrics::counter!("page_renders_total", "outcome" => label, "tier" => tier).increment(1);
    metrics::histogram!("page_render_duration_seconds").record(started.elapsed().as_secs_f64());

    Ok(outcome)
}

struct PageMarkup {
    head: Markup,
    body: Markup,
}

fn page_document(page: &Page, url_path: &str, head_config: &HeadConfig, preview: bool) -> PageMarkup {
    let head = match &page.seo {
        Some(seo) => head::manifest_head(&head::HeadProps::from_seo(seo, url_path), head_config),
        None => html! {},
    };

    let is_index = page.slug.as_deref().map(normalize_slug).as_deref() == Some(INDEX_SLUG);
    let blocks = page.content_collection.iter().flat_map(|c| c.iter());

    let body = html! {
        div class="page" data-slug=[page.slug.as_deref()] data-preview=[preview.then_some("true")] {
            @if is_index {
                div class="index-page" { "index page" }
            }
            @for block in blocks {
                (components::content_block(block))
            }
        }
    };

    PageMarkup { head, body }
}
