//! Preview mode toggle endpoints.
//!
//! `GET /api/preview?slug=..&secret=..` turns preview mode on when the
//! secret matches the preview token. `GET /api/exit-preview?slug=..` turns
//! it off. Both redirect to `/<slug>` and pass any other query parameters
//! through.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::error::SiteError;
use crate::preview;
use crate::state::AppState;

/// Query parameters in request order, duplicates kept.
type Params = Vec<(String, String)>;

/// Bytes escaped in a slug segment of the redirect path.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Enter preview mode.
pub async fn enter_preview(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Response, SiteError> {
    let (slug, secret, rest) = split_params(params);

    let expected = state.config.contentful.preview_token.as_deref();
    let signing_key = state.config.preview_secret.as_deref();
    let (Some(expected), Some(signing_key)) = (expected, signing_key) else {
        metrics::counter!("preview_rejections_total").increment(1);
        return Err(SiteError::Unauthorized);
    };
    if secret.as_deref() != Some(expected) {
        metrics::counter!("preview_rejections_total").increment(1);
        tracing::warn!(slug = %slug, "preview request with invalid token");
        return Err(SiteError::Unauthorized);
    }

    metrics::counter!("preview_sessions_total").increment(1);
    tracing::info!(slug = %slug, "preview mode enabled");

    let cookie = preview::enable_cookie(signing_key, state.config.production);
    Ok(redirect_with_cookie(&redirect_target(&slug, &rest), cookie))
}

/// Leave preview mode.
pub async fn exit_preview(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Response {
    let (slug, _, rest) = split_params(params);
    tracing::info!(slug = %slug, "preview mode disabled");

    let cookie = preview::clear_cookie(state.config.production);
    redirect_with_cookie(&redirect_target(&slug, &rest), cookie)
}

fn redirect_with_cookie(location: &str, cookie: String) -> Response {
    ([(SET_COOKIE, cookie)], Redirect::temporary(location)).into_response()
}

/// Separate `slug` and `secret` from the parameters to pass through.
///
/// A missing slug is empty, which redirects to `/`.
fn split_params(params: Params) -> (String, Option<String>, Params) {
    let mut slug = None;
    let mut secret = None;
    let mut rest = Vec::with_capacity(params.len());
    for (key, value) in params {
        match key.as_str() {
            "slug" => {
                slug.get_or_insert(value);
            }
            "secret" => {
                secret.get_or_insert(value);
            }
            _ => rest.push((key, value)),
        }
    }
    (slug.unwrap_or_default(), secret, rest)
}

/// `/<slug>` followed by `?<params>` when any remain.
///
/// Slug segments are percent-encoded and empty ones dropped.
pub fn redirect_target(slug: &str, params: &[(String, String)]) -> String {
    let path = slug
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    let mut target = format!("/{path}");
    if !params.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        target.push('?');
        target.push_str(&query);
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Params {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn target_without_params() {
        assert_eq!(redirect_target("about", &[]), "/about");
        assert_eq!(redirect_target("", &[]), "/");
        assert_eq!(redirect_target("blog/post", &[]), "/blog/post");
    }

    #[test]
    fn target_escapes_slug() {
        assert_eq!(redirect_target("\r\n", &[]), "/%0D%0A");
        assert_eq!(redirect_target("a b/ü", &[]), "/a%20b/%C3%BC");
        assert_eq!(redirect_target("x?y#z", &[]), "/x%3Fy%23z");
    }

    #[test]
    fn target_stays_on_site() {
        assert_eq!(redirect_target("/evil.com", &[]), "/evil.com");
        assert_eq!(redirect_target("//evil.com/x", &[]), "/evil.com/x");
        assert_eq!(redirect_target("about/", &[]), "/about");
    }

    #[test]
    fn target_with_params() {
        assert_eq!(
            redirect_target("about", &pairs(&[("a", "1"), ("b", "x y")])),
            "/about?a=1&b=x+y"
        );
    }

    #[test]
    fn split_removes_slug_and_secret() {
        let (slug, secret, rest) = split_params(pairs(&[
            ("secret", "s"),
            ("utm", "mail"),
            ("slug", "about"),
            ("slug", "ignored"),
        ]));
        assert_eq!(slug, "about");
        assert_eq!(secret.as_deref(), Some("s"));
        assert_eq!(rest, pairs(&[("utm", "mail")]));
    }

    #[test]
    fn split_defaults_to_empty_slug() {
        let (slug, secret, rest) = split_params(Vec::new());
        assert_eq!(slug, "");
        assert!(secret.is_none());
        assert!(rest.is_empty());
    }
}
