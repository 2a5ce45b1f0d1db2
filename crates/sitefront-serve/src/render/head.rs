//! Document head built from page SEO metadata and site-wide head settings.

use maud::{Markup, html};
use sitefront_core::HeadConfig;
use sitefront_core::model::Seo;

const APPLE_ICON_SIZE: &str = "192x192";

/// Per-page head values.
#[derive(Debug, Clone, Default)]
pub struct HeadProps<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub keywords: Option<&'a [Option<String>]>,
    /// Path of the page, joined onto the link prefix for the canonical link.
    pub canonical_path: Option<&'a str>,
    pub no_index: bool,
    pub no_follow: bool,
}

impl<'a> HeadProps<'a> {
    /// Head values for a page with the given SEO entry.
    pub fn from_seo(seo: &'a Seo, canonical_path: &'a str) -> Self {
        Self {
            title: seo.title.as_deref().unwrap_or_default(),
            description: seo.description.as_deref(),
            keywords: seo.keywords.as_deref(),
            canonical_path: Some(canonical_path),
            no_index: seo.no_index.unwrap_or(false),
            no_follow: seo.no_follow.unwrap_or(false),
        }
    }

    /// Description, falling back to the title.
    pub fn description(&self) -> &str {
        self.description.unwrap_or(self.title)
    }

    /// Keywords joined by `, ` with empty entries dropped; the title when
    /// no keyword list is set.
    pub fn keywords(&self) -> String {
        match self.keywords {
            Some(list) => list
                .iter()
                .flatten()
                .filter(|k| !k.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            None => self.title.to_string(),
        }
    }

    /// `robots` meta content, if crawlers are restricted.
    pub fn robots(&self) -> Option<String> {
        let directives: Vec<&str> = [
            self.no_index.then_some("noindex"),
            self.no_follow.then_some("nofollow"),
        ]
        .into_iter()
        .flatten()
        .collect();
        (!directives.is_empty()).then(|| directives.join(","))
    }
}

/// Join an asset path onto the link prefix.
pub fn prefixed(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Render the head elements of a page.
pub fn manifest_head(props: &HeadProps<'_>, config: &HeadConfig) -> Markup {
    let prefix = config.link_prefix.as_str();
    let theme_color = config.theme_color.as_deref();
    let apple_icon = config.icon_192_path.as_deref().map(|p| prefixed(prefix, p));

    html! {
        title { (props.title) }
        meta charset="utf-8";
        meta name="description" content=(props.description());
        @if let Some(color) = theme_color {
            meta name="theme-color" content=(color);
        }
        meta name="keywords" content=(props.keywords());
        meta http-equiv="X-UA-Compatible" content="ie=edge";
        @if let Some(path) = props.canonical_path {
            link rel="canonical" href=(prefixed(prefix, path));
        }
        @if let Some(path) = config.manifest_path.as_deref() {
            link rel="manifest" href=(prefixed(prefix, path));
        }
        @if let Some(path) = config.fav_icon_path.as_deref() {
            link rel="shortcut icon" href=(prefixed(prefix, path));
        }
        @if let Some(robots) = props.robots() {
            meta name="robots" content=(robots);
        }

        // Safari
        meta name="apple-mobile-web-app-capable" content="yes";
        meta name="apple-mobile-web-app-status-bar-style" content="blue";
        meta name="apple-mobile-web-app-title" content=(props.title);
        @if let Some(icon) = &apple_icon {
            link rel="apple-touch-icon" sizes=(APPLE_ICON_SIZE) href=(icon);
        }

        // IE
        @if let Some(icon) = &apple_icon {
            meta name="msapplication-TitleImage" content=(icon);
        }
        @if let Some(color) = theme_color {
            meta name="msapplication-TitleColor" content=(color);
        }
    }
}
