//! Content access for the sitefront page service.
//!
//! This crate provides:
//! - A GraphQL client for the Contentful API with public and preview credentials
//! - A normalized, schema-aware result cache keyed by entity identity
//! - The [`ContentSource`] seam used by rendering and path resolution
//! - Static path resolution from published page slugs
//! - Schema introspection and the minified schema file
//! - Prometheus metrics helpers
//! - Shared error types

pub mod cache;
pub mod client;
pub mod config;
pub mod documents;
mod error;
pub mod fs;
pub mod metrics;
pub mod model;
pub mod paths;
pub mod schema;
pub mod source;

pub use cache::{CacheSnapshot, KeyRule, KeyRules, NormalizedCache};
pub use client::GraphQlClient;
pub use config::{ContentfulConfig, HeadConfig, is_production};
pub use error::{Error, Result};
pub use model::{Page, PageCollectionData, PageContent, PageSlugsData, Seo};
pub use paths::{
    Fallback, RoutePath, StaticPaths, normalize_slug, page_slug, resolve_static_paths,
};
pub use schema::{Schema, load_schema};
pub use source::{ContentSource, ContentfulSource, RequestPolicy};
