//! GraphQL documents sent to the content API.
//!
//! Every selection set requests `__typename`, and every entry requests
//! `sys { id }`, so responses can be normalized by [`crate::cache`].

use serde::Serialize;

/// Enumerates the slugs of every page.
pub const GET_PAGE_SLUGS: &str = r#"query GetPageSlugs($preview: Boolean) {
  pageCollection(preview: $preview) {
    __typename
    items {
      __typename
      sys { __typename id }
      slug
    }
  }
}"#;

/// Fetches every page with its SEO metadata and content blocks.
pub const GET_PAGE_COLLECTION: &str = r#"query GetPageCollection($preview: Boolean) {
  pageCollection(preview: $preview) {
    __typename
    items {
      __typename
      sys { __typename id }
      slug
      seo {
        __typename
        sys { __typename id }
        title
        description
        keywords
        noIndex
        noFollow
      }
      contentCollection {
        __typename
        items {
          __typename
          sys { __typename id }
          title
          body
        }
      }
    }
  }
}"#;

/// Variables shared by both page queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreviewVariables {
    /// Fetch draft content instead of published content.
    pub preview: bool,
}
