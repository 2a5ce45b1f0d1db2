//! Static path resolution.
//!
//! Every published page slug becomes a route. Paths that were not known at
//! resolution time are rendered on first request ([`Fallback::Blocking`]).

use crate::source::ContentSource;

/// Slug of the page served at `/`.
pub const INDEX_SLUG: &str = "index";

/// A route derived from a page slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoutePath {
    pub segments: Vec<String>,
}

impl RoutePath {
    /// Split a slug on `/` into route segments, dropping empty ones.
    pub fn from_slug(slug: &str) -> Self {
        Self {
            segments: slug
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// The page slug this route renders.
    pub fn slug(&self) -> String {
        page_slug(&self.segments)
    }

    /// Whether this is the index route.
    pub fn is_index(&self) -> bool {
        self.slug() == INDEX_SLUG
    }

    /// URL path for the route; the index route is `/`.
    pub fn to_url_path(&self) -> String {
        if self.is_index() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }
}

/// What happens for paths missing from the resolved list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Render on first request, then serve like a prerendered route.
    #[default]
    Blocking,
}

/// The result of path resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaticPaths {
    pub paths: Vec<RoutePath>,
    pub fallback: Fallback,
}

/// Resolve the routes to prerender from the published page slugs.
///
/// Never fails: an API error yields an empty route list, leaving every page
/// to the blocking fallback.
pub async fn resolve_static_paths(source: &dyn ContentSource) -> StaticPaths {
    let data = match source.page_slugs(false).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "failed to resolve static paths; relying on fallback");
            return StaticPaths::default();
        }
    };

    let paths: Vec<RoutePath> = data
        .page_collection
        .iter()
        .flat_map(|collection| collection.iter())
        .filter_map(|page| page.slug.as_deref())
        .map(RoutePath::from_slug)
        .filter(|route| !route.segments.is_empty())
        .collect();

    tracing::info!(routes = paths.len(), "resolved static paths");
    StaticPaths {
        paths,
        fallback: Fallback::Blocking,
    }
}

/// Canonical form of a slug: empty segments removed, so `about/` and
/// `a//b` match the request paths `/about` and `/a/b`.
pub fn normalize_slug(slug: &str) -> String {
    slug.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Page slug for catch-all route segments: joined with `/`, or
/// [`INDEX_SLUG`] when there are none.
pub fn page_slug(segments: &[String]) -> String {
    if segments.is_empty() {
        INDEX_SLUG.to_string()
    } else {
        segments.join("/")
    }
}
