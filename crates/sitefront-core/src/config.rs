//! Content API and site head configuration loaded from environment variables.

/// Base URL of the Contentful GraphQL content API.
pub const CONTENTFUL_GRAPHQL_BASE: &str = "https://graphql.contentful.com/content/v1";

/// Connection settings for the Contentful GraphQL API.
#[derive(Debug, Clone, Default)]
pub struct ContentfulConfig {
    /// Full GraphQL endpoint URL.
    pub endpoint: String,

    /// Delivery token for published content.
    pub access_token: Option<String>,

    /// Preview token for draft content. Also the shared secret of the
    /// preview entry endpoint.
    pub preview_token: Option<String>,
}

impl ContentfulConfig {
    /// Load the content API configuration from environment variables.
    ///
    /// Optional:
    /// - `CONTENTFUL_GRAPHQL_ENDPOINT`: Full endpoint URL (overrides the two below)
    /// - `CONTENTFUL_SPACE_ID`: Space ID (default: "")
    /// - `CONTENTFUL_ENVIRONMENT`: Environment name (default: "master")
    /// - `CONTENTFUL_ACCESS_TOKEN`: Delivery token
    /// - `CONTENTFUL_PREVIEW_TOKEN`: Preview token
    pub fn from_env() -> Self {
        let endpoint = non_empty_var("CONTENTFUL_GRAPHQL_ENDPOINT").unwrap_or_else(|| {
            let space = std::env::var("CONTENTFUL_SPACE_ID").unwrap_or_default();
            let environment =
                non_empty_var("CONTENTFUL_ENVIRONMENT").unwrap_or_else(|| "master".to_string());
            format!("{CONTENTFUL_GRAPHQL_BASE}/spaces/{space}/environments/{environment}")
        });

        let config = Self {
            endpoint,
            access_token: non_empty_var("CONTENTFUL_ACCESS_TOKEN"),
            preview_token: non_empty_var("CONTENTFUL_PREVIEW_TOKEN"),
        };

        tracing::info!(
            endpoint = %config.endpoint,
            access_token = config.access_token.is_some(),
            preview_token = config.preview_token.is_some(),
            "contentful configuration loaded"
        );

        config
    }

    /// Token for the given credential tier, if configured.
    pub fn token(&self, preview: bool) -> Option<&str> {
        if preview {
            self.preview_token.as_deref()
        } else {
            self.access_token.as_deref()
        }
    }
}

/// Site-wide defaults for the document head.
#[derive(Debug, Clone, Default)]
pub struct HeadConfig {
    /// Prefix joined in front of every asset link (e.g. "/site").
    pub link_prefix: String,

    /// `theme-color` meta value.
    pub theme_color: Option<String>,

    /// Web app manifest path.
    pub manifest_path: Option<String>,

    /// 192px icon path, used for the Apple touch icon and IE tile image.
    pub icon_192_path: Option<String>,

    /// Favicon path.
    pub fav_icon_path: Option<String>,
}

impl HeadConfig {
    /// Load head defaults from environment variables.
    ///
    /// Optional:
    /// - `SITE_LINK_PREFIX` (default: "")
    /// - `SITE_THEME_COLOR`
    /// - `SITE_MANIFEST_PATH`
    /// - `SITE_ICON_192_PATH`
    /// - `SITE_FAV_ICON_PATH`
    pub fn from_env() -> Self {
        Self {
            link_prefix: std::env::var("SITE_LINK_PREFIX").unwrap_or_default(),
            theme_color: non_empty_var("SITE_THEME_COLOR"),
            manifest_path: non_empty_var("SITE_MANIFEST_PATH"),
            icon_192_path: non_empty_var("SITE_ICON_192_PATH"),
            fav_icon_path: non_empty_var("SITE_FAV_ICON_PATH"),
        }
    }
}

/// Whether the site runs in production (`SITE_ENV=production`).
pub fn is_production() -> bool {
    std::env::var("SITE_ENV").is_ok_and(|v| v == "production")
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
