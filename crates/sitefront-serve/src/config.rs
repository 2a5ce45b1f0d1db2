//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use sitefront_core::{ContentfulConfig, HeadConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Key used to sign the preview cookie. Defaults to the preview token.
    pub preview_secret: Option<String>,

    /// Output directory of the `build` command.
    pub out_dir: PathBuf,

    /// How long a stored page is served before it is rendered again.
    /// `None` keeps pages until restart.
    pub revalidate: Option<Duration>,

    /// Port of the Prometheus `/metrics` server, if enabled.
    pub metrics_port: Option<u16>,

    /// Production mode: the preview cookie is marked `Secure`.
    pub production: bool,

    /// Content API connection.
    pub contentful: ContentfulConfig,

    /// Site-wide head defaults.
    pub head: HeadConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - None (all have defaults for local development)
    ///
    /// Optional:
    /// - `SITE_BIND_ADDR`: Server bind address (default: "0.0.0.0:3000")
    /// - `SITE_PREVIEW_SECRET`: Preview cookie signing key (default: preview token)
    /// - `SITE_OUT_DIR`: Build output directory (default: "out")
    /// - `SITE_REVALIDATE_SECS`: Page store TTL in seconds (default: none)
    /// - `SITE_METRICS_PORT`: Prometheus exporter port (default: disabled)
    /// - `SITE_ENV`: "production" enables secure cookies
    /// - Content API and head variables, see [`ContentfulConfig::from_env`]
    ///   and [`HeadConfig::from_env`]
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("SITE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let contentful = ContentfulConfig::from_env();
        let head = HeadConfig::from_env();

        let preview_secret =
            non_empty_var("SITE_PREVIEW_SECRET").or_else(|| contentful.preview_token.clone());

        let out_dir = PathBuf::from(non_empty_var("SITE_OUT_DIR").unwrap_or_else(|| "out".into()));

        let revalidate = non_empty_var("SITE_REVALIDATE_SECS")
            .map(|v| v.parse::<u64>().context("SITE_REVALIDATE_SECS must be seconds"))
            .transpose()?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let metrics_port = non_empty_var("SITE_METRICS_PORT")
            .map(|v| v.parse::<u16>().context("SITE_METRICS_PORT must be a port"))
            .transpose()?;

        let production = sitefront_core::is_production();

        tracing::info!(
            bind_addr = %bind_addr,
            out_dir = %out_dir.display(),
            revalidate_secs = revalidate.map(|d| d.as_secs()),
            metrics_port = metrics_port,
            production,
            "site configuration loaded"
        );

        Ok(Self {
            bind_addr,
            preview_secret,
            out_dir,
            revalidate,
            metrics_port,
            production,
            contentful,
            head,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "SITE_BIND_ADDR",
        "SITE_PREVIEW_SECRET",
        "SITE_OUT_DIR",
        "SITE_REVALIDATE_SECS",
        "SITE_METRICS_PORT",
        "SITE_ENV",
        "CONTENTFUL_PREVIEW_TOKEN",
        "CONTENTFUL_ACCESS_TOKEN",
    ];

    /// Helper to run config tests with isolated env vars.
    /// Uses a mutex to prevent concurrent env var races.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:3000");
            assert_eq!(config.out_dir, PathBuf::from("out"));
            assert!(config.preview_secret.is_none());
            assert!(config.revalidate.is_none());
            assert!(config.metrics_port.is_none());
            assert!(!config.production);
        });
    }

    #[test]
    fn config_custom_values() {
        with_env_vars(
            &[
                ("SITE_BIND_ADDR", "127.0.0.1:9090"),
                ("SITE_OUT_DIR", "dist"),
                ("SITE_REVALIDATE_SECS", "60"),
                ("SITE_METRICS_PORT", "9091"),
                ("SITE_ENV", "production"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.bind_addr, "127.0.0.1:9090");
                assert_eq!(config.out_dir, PathBuf::from("dist"));
                assert_eq!(config.revalidate, Some(Duration::from_secs(60)));
                assert_eq!(config.metrics_port, Some(9091));
                assert!(config.production);
            },
        );
    }

    #[test]
    fn config_preview_secret_falls_back_to_token() {
        with_env_vars(&[("CONTENTFUL_PREVIEW_TOKEN", "draft")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.preview_secret.as_deref(), Some("draft"));
        });

        with_env_vars(
            &[
                ("CONTENTFUL_PREVIEW_TOKEN", "draft"),
                ("SITE_PREVIEW_SECRET", "signing-key"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.preview_secret.as_deref(), Some("signing-key"));
                assert_eq!(config.contentful.preview_token.as_deref(), Some("draft"));
            },
        );
    }

    #[test]
    fn config_zero_revalidate_disables_ttl() {
        with_env_vars(&[("SITE_REVALIDATE_SECS", "0")], || {
            let config = Config::from_env().unwrap();
            assert!(config.revalidate.is_none());
        });
    }

    #[test]
    fn config_rejects_bad_numbers() {
        with_env_vars(&[("SITE_REVALIDATE_SECS", "soon")], || {
            assert!(Config::from_env().is_err());
        });
        with_env_vars(&[("SITE_METRICS_PORT", "99999")], || {
            assert!(Config::from_env().is_err());
        });
    }
}
