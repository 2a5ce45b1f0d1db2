//! HTTP transport for the Contentful GraphQL API.
//!
//! One endpoint, two credential tiers: the delivery token for published
//! content and the preview token for drafts.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ContentfulConfig;
use crate::error::{Error, Result};

/// Connect timeout for API requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall timeout for a single API request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

static ACCESS_TOKEN_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ACCESS_TOKEN").expect("valid regex"));

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    /// Human-readable message.
    pub message: String,
    /// Vendor extensions; Contentful puts its error code under `contentful.code`.
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphQlError {
    /// Contentful error code, if present.
    pub fn contentful_code(&self) -> Option<&str> {
        self.extensions
            .as_ref()?
            .get("contentful")?
            .get("code")?
            .as_str()
    }

    /// Whether this error reports a rejected or missing access token.
    pub fn is_auth_error(&self) -> bool {
        self.contentful_code()
            .is_some_and(|code| ACCESS_TOKEN_CODE.is_match(code))
    }
}

/// GraphQL client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    config: ContentfulConfig,
}

impl GraphQlClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: ContentfulConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ContentfulConfig {
        &self.config
    }

    /// Execute a document and return its `data` object.
    ///
    /// `preview` selects the preview token instead of the delivery token.
    /// When the selected token is not configured the request is sent
    /// without an `Authorization` header.
    ///
    /// Partial results (data alongside errors) are returned with the errors
    /// logged. Errors without data become [`Error::GraphQl`], and token
    /// problems become [`Error::Auth`].
    pub async fn execute(&self, document: &str, variables: &Value, preview: bool) -> Result<Value> {
        metrics::counter!("graphql_requests_total", "tier" => tier_label(preview)).increment(1);

        let mut request = self
            .http
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&GraphQlRequest {
                query: document,
                variables,
            });
        if let Some(token) = self.config.token(preview) {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            metrics::counter!("graphql_errors_total", "kind" => "auth").increment(1);
            return Err(Error::Auth(truncate(&body)));
        }

        let parsed: GraphQlResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                metrics::counter!("graphql_errors_total", "kind" => "status").increment(1);
                return Err(Error::Status {
                    status: status.as_u16(),
                    body: truncate(&body),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(auth) = parsed.errors.iter().find(|e| e.is_auth_error()) {
            metrics::counter!("graphql_errors_total", "kind" => "auth").increment(1);
            return Err(Error::Auth(auth.message.clone()));
        }

        match parsed.data {
            Some(data) if !data.is_null() => {
                if !parsed.errors.is_empty() {
                    tracing::warn!(
                        errors = parsed.errors.len(),
                        first = %parsed.errors[0].message,
                        "GraphQL response contained partial errors"
                    );
                }
                Ok(data)
            }
            _ if !parsed.errors.is_empty() => {
                metrics::counter!("graphql_errors_total", "kind" => "graphql").increment(1);
                Err(Error::GraphQl(
                    parsed.errors.into_iter().map(|e| e.message).collect(),
                ))
            }
            _ if !status.is_success() => Err(Error::Status {
                status: status.as_u16(),
                body: truncate(&body),
            }),
            _ => Err(Error::MissingData),
        }
    }
}

/// Metric label for a credential tier.
pub fn tier_label(preview: bool) -> &'static str {
    if preview { "preview" } else { "public" }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
