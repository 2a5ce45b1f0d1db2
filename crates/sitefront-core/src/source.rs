//! Content sources: where page data comes from.
//!
//! [`ContentSource`] is the seam between rendering and the API. The
//! production implementation, [`ContentfulSource`], runs every query
//! through a normalized cache per credential tier:
//!
//! - published content is served cache-first;
//! - preview content always goes to the network, so editors see their
//!   latest draft.
//!
//! Identical queries that arrive while one is already in flight wait for
//! it and reuse its result instead of issuing a second request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::cache::{CacheSnapshot, KeyRules, NormalizedCache, QueryKey, query_key};
use crate::client::{GraphQlClient, tier_label};
use crate::documents::{GET_PAGE_COLLECTION, GET_PAGE_SLUGS, PreviewVariables};
use crate::error::Result;
use crate::model::{PageCollectionData, PageSlugsData};
use crate::schema::Schema;

/// Provides page data for path resolution and rendering.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Slugs of every page.
    async fn page_slugs(&self, preview: bool) -> Result<PageSlugsData>;

    /// Every page with SEO metadata and content blocks.
    async fn page_collection(&self, preview: bool) -> Result<PageCollectionData>;

    /// Cache state behind the most recent page collection result, for
    /// embedding in rendered pages. Sources without a cache return `None`.
    fn page_collection_snapshot(&self, _preview: bool) -> Option<CacheSnapshot> {
        None
    }
}

/// How a query consults the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPolicy {
    /// Answer from the cache when possible; fetch on a miss.
    CacheFirst,
    /// Always fetch; the result still refreshes the cache.
    NetworkOnly,
}

impl RequestPolicy {
    /// Policy for a credential tier.
    pub fn for_tier(preview: bool) -> Self {
        if preview {
            Self::NetworkOnly
        } else {
            Self::CacheFirst
        }
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// [`ContentSource`] backed by the Contentful GraphQL API.
pub struct ContentfulSource {
    client: GraphQlClient,
    public: NormalizedCache,
    preview: NormalizedCache,
    // One gate per (tier, query); the key space is the fixed set of documents.
    gates: Mutex<HashMap<(bool, QueryKey), Gate>>,
}

impl ContentfulSource {
    /// Create a source with the standard key rules.
    ///
    /// `ttl` bounds how long a published query result is served from the
    /// cache; `None` keeps results until invalidated.
    pub fn new(client: GraphQlClient, schema: Option<Schema>, ttl: Option<Duration>) -> Self {
        Self {
            client,
            public: NormalizedCache::new(KeyRules::contentful(), schema.clone()).with_ttl(ttl),
            preview: NormalizedCache::new(KeyRules::contentful(), schema),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// The cache for a credential tier.
    pub fn cache(&self, preview: bool) -> &NormalizedCache {
        if preview { &self.preview } else { &self.public }
    }

    /// Run a page query through the cache and decode its data.
    pub async fn query<T: DeserializeOwned>(&self, document: &str, preview: bool) -> Result<T> {
        let variables = serde_json::to_value(PreviewVariables { preview })?;
        let key = query_key(document, &variables);
        let cache = self.cache(preview);
        let policy = RequestPolicy::for_tier(preview);
        let tier = tier_label(preview);

        if policy == RequestPolicy::CacheFirst
            && let Some(hit) = cache.read(key)
        {
            metrics::counter!("graphql_cache_hits_total", "tier" => tier).increment(1);
            return Ok(serde_json::from_value(hit)?);
        }

        let waiting_since = Instant::now();
        let gate = self.gate(preview, key);
        let _guard = gate.lock().await;

        let coalesced = match policy {
            RequestPolicy::CacheFirst => cache.read(key),
            RequestPolicy::NetworkOnly => cache.read_since(key, waiting_since),
        };
        if let Some(hit) = coalesced {
            tracing::debug!(query = key, tier, "reused in-flight result");
            metrics::counter!("graphql_cache_hits_total", "tier" => tier).increment(1);
            return Ok(serde_json::from_value(hit)?);
        }

        metrics::counter!("graphql_cache_misses_total", "tier" => tier).increment(1);
        tracing::debug!(query = key, tier, "fetching from content API");
        let data = self.client.execute(document, &variables, preview).await?;
        cache.write(key, &data);

        Ok(serde_json::from_value(data)?)
    }

    fn gate(&self, preview: bool, key: QueryKey) -> Gate {
        self.gates
            .lock()
            .entry((preview, key))
            .or_default()
            .clone()
    }
}

#[async_trait]
impl ContentSource for ContentfulSource {
    async fn page_slugs(&self, preview: bool) -> Result<PageSlugsData> {
        self.query(GET_PAGE_SLUGS, preview).await
    }

    async fn page_collection(&self, preview: bool) -> Result<PageCollectionData> {
        self.query(GET_PAGE_COLLECTION, preview).await
    }

    fn page_collection_snapshot(&self, preview: bool) -> Option<CacheSnapshot> {
        let variables = serde_json::to_value(PreviewVariables { preview }).ok()?;
        let key = query_key(GET_PAGE_COLLECTION, &variables);
        let snapshot = self.cache(preview).extract(&[key]);
        (!snapshot.queries.is_empty()).then_some(snapshot)
    }
}
