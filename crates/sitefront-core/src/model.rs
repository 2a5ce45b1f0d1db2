//! Content model for pages as returned by the GraphQL API.
//!
//! Every field is optional on the wire; entries can be half-filled while
//! drafted in the CMS, so missing values deserialize to `None` instead of
//! failing the whole collection.

use serde::{Deserialize, Serialize};

use crate::paths::normalize_slug;

/// System metadata attached to every CMS entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Sys {
    /// Entry ID, stable across publishes.
    #[serde(default)]
    pub id: String,
}

/// SEO metadata of a page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seo {
    /// Entry metadata.
    #[serde(default)]
    pub sys: Option<Sys>,
    /// Document title. A page without one is not rendered.
    #[serde(default)]
    pub title: Option<String>,
    /// Meta description.
    #[serde(default)]
    pub description: Option<String>,
    /// Meta keywords. Individual entries may be null.
    #[serde(default)]
    pub keywords: Option<Vec<Option<String>>>,
    /// Ask crawlers not to index the page.
    #[serde(default)]
    pub no_index: Option<bool>,
    /// Ask crawlers not to follow links on the page.
    #[serde(default)]
    pub no_follow: Option<bool>,
}

/// A content block nested inside a page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PageContent {
    /// Entry metadata.
    #[serde(default)]
    pub sys: Option<Sys>,
    /// Block heading.
    #[serde(default)]
    pub title: Option<String>,
    /// Block text.
    #[serde(default)]
    pub body: Option<String>,
}

/// A paginated collection of items.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Collection<T> {
    /// Items of the current page of results. Unresolvable links are null.
    #[serde(default = "Vec::new")]
    pub items: Vec<Option<T>>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Collection<T> {
    /// Iterate over the non-null items.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().flatten()
    }
}

/// A page entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Entry metadata.
    #[serde(default)]
    pub sys: Option<Sys>,
    /// URL path of the page, e.g. `index` or `products/shoes`.
    #[serde(default)]
    pub slug: Option<String>,
    /// SEO metadata.
    #[serde(default)]
    pub seo: Option<Seo>,
    /// Nested content blocks.
    #[serde(default)]
    pub content_collection: Option<Collection<PageContent>>,
}

impl Page {
    /// The SEO title, if the page has one that is non-empty.
    pub fn seo_title(&self) -> Option<&str> {
        self.seo
            .as_ref()
            .and_then(|seo| seo.title.as_deref())
            .filter(|title| !title.is_empty())
    }
}

/// Slug-only projection of a page, as returned by the slugs query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PageSlug {
    /// URL path of the page.
    #[serde(default)]
    pub slug: Option<String>,
}

/// Response data of the slugs query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSlugsData {
    /// Collection of slugs; null when the space has no page content type.
    #[serde(default)]
    pub page_collection: Option<Collection<PageSlug>>,
}

/// Response data of the page collection query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCollectionData {
    /// Collection of full pages.
    #[serde(default)]
    pub page_collection: Option<Collection<Page>>,
}

impl PageCollectionData {
    /// Find the page whose normalized slug equals `slug`.
    pub fn find_by_slug(&self, slug: &str) -> Option<&Page> {
        self.page_collection
            .as_ref()?
            .iter()
            .find(|page| page.slug.as_deref().map(normalize_slug).as_deref() == Some(slug))
    }
}
