//! In-memory content source and state for handler tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sitefront_core::model::{Collection, PageSlug, PageSlugsData, Seo};
use sitefront_core::{ContentSource, ContentfulConfig, Error, HeadConfig, Page, PageCollectionData, Result};

use crate::config::Config;
use crate::state::AppState;

/// Preview token and cookie secret used by test states.
pub const TEST_SECRET: &str = "secret";

/// A page with the given slug and optional SEO title.
pub fn page(slug: &str, title: Option<&str>) -> Page {
    Page {
        slug: Some(slug.to_string()),
        seo: title.map(|t| Seo {
            title: Some(t.to_string()),
            ..Seo::default()
        }),
        ..Page::default()
    }
}

/// Content source serving fixed pages per tier.
#[derive(Default)]
pub struct FakeSource {
    published: Option<Vec<Page>>,
    drafts: Option<Vec<Page>>,
    collection_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_pages(pages: Vec<Page>) -> Self {
        Self {
            drafts: Some(pages.clone()),
            published: Some(pages),
            ..Self::default()
        }
    }

    pub fn with_drafts(mut self, drafts: Vec<Page>) -> Self {
        self.drafts = Some(drafts);
        self
    }

    /// A source whose every query fails.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Number of page collection queries served.
    pub fn collection_calls(&self) -> usize {
        self.collection_calls.load(Ordering::SeqCst)
    }

    fn pages(&self, preview: bool) -> Result<&[Page]> {
        let pages = if preview { &self.drafts } else { &self.published };
        pages.as_deref().ok_or(Error::MissingData)
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn page_slugs(&self, preview: bool) -> Result<PageSlugsData> {
        let items = self
            .pages(preview)?
            .iter()
            .map(|page| {
                Some(PageSlug {
                    slug: page.slug.clone(),
                })
            })
            .collect();
        Ok(PageSlugsData {
            page_collection: Some(Collection { items }),
        })
    }

    async fn page_collection(&self, preview: bool) -> Result<PageCollectionData> {
        self.collection_calls.fetch_add(1, Ordering::SeqCst);
        let items = self.pages(preview)?.iter().cloned().map(Some).collect();
        Ok(PageCollectionData {
            page_collection: Some(Collection { items }),
        })
    }
}

/// Configuration for tests; output goes to `out_dir`.
pub fn test_config(out_dir: PathBuf) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        preview_secret: Some(TEST_SECRET.to_string()),
        out_dir,
        revalidate: None,
        metrics_port: None,
        production: false,
        contentful: ContentfulConfig {
            endpoint: "http://127.0.0.1:9/graphql".to_string(),
            access_token: None,
            preview_token: Some(TEST_SECRET.to_string()),
        },
        head: HeadConfig::default(),
    }
}

/// State over a source the test no longer needs to inspect.
pub fn test_state(source: FakeSource) -> AppState {
    shared_state(Arc::new(source))
}

/// State over a source the test keeps a handle to.
pub fn shared_state(source: Arc<FakeSource>) -> AppState {
    AppState::new(test_config(PathBuf::from("out")), source)
}
