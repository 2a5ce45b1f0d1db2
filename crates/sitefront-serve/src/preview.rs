//! Preview mode cookie.
//!
//! Preview mode is a request-scoped flag carried in the `__site_preview`
//! cookie. The cookie value is `<issued_at>.<hex HMAC-SHA256>` signed with
//! the configured preview secret, so it cannot be forged without the key.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Name of the preview cookie.
pub const PREVIEW_COOKIE: &str = "__site_preview";

const CLEARED_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

fn mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Sign a cookie value issued at `issued_at` (unix seconds).
pub fn sign(secret: &str, issued_at: i64) -> String {
    let payload = issued_at.to_string();
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{payload}.{signature}")
}

/// Check a cookie value against the secret.
pub fn verify(secret: &str, value: &str) -> bool {
    let Some((payload, signature)) = value.split_once('.') else {
        return false;
    };
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// `Set-Cookie` value that turns preview mode on.
pub fn enable_cookie(secret: &str, production: bool) -> String {
    let value = sign(secret, chrono::Utc::now().timestamp());
    with_attributes(format!("{PREVIEW_COOKIE}={value}"), production)
}

/// `Set-Cookie` value that turns preview mode off.
pub fn clear_cookie(production: bool) -> String {
    with_attributes(
        format!("{PREVIEW_COOKIE}=; Max-Age=0; Expires={CLEARED_EXPIRES}"),
        production,
    )
}

fn with_attributes(cookie: String, production: bool) -> String {
    let mut cookie = format!("{cookie}; Path=/; HttpOnly; SameSite=Lax");
    if production {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Find the preview cookie value in a `Cookie` header.
fn cookie_value(header: &str) -> Option<&str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(PREVIEW_COOKIE)?.strip_prefix('='))
}

/// Whether the request carries a valid preview cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreviewMode(pub bool);

impl PreviewMode {
    /// Read preview mode from request headers.
    ///
    /// Without a configured secret no cookie is accepted.
    pub fn from_headers(headers: &axum::http::HeaderMap, secret: Option<&str>) -> Self {
        let Some(secret) = secret else {
            return Self(false);
        };
        let enabled = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(cookie_value)
            .any(|value| verify(secret, value));
        Self(enabled)
    }
}

impl FromRequestParts<AppState> for PreviewMode {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(
            &parts.headers,
            state.config.preview_secret.as_deref(),
        ))
    }
}
