//! sitefront - HTTP server and static builder for CMS-driven pages.
//!
//! `serve` prerenders every published page into memory and serves the site,
//! `build` writes the prerendered pages to disk, and `schema` refreshes the
//! GraphQL schema file used by the result cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::http::Request;
use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use sitefront_core::metrics::{init_metrics, start_metrics_server};
use sitefront_core::schema::{DEFAULT_SCHEMA_PATH, Schema, load_schema};
use sitefront_core::{ContentfulSource, GraphQlClient};
use sitefront_serve::{AppState, Config, prerender, router};

/// sitefront - server-rendered pages for a Contentful space.
#[derive(Parser, Debug)]
#[command(name = "sitefront")]
#[command(about = "Prerendering page server for Contentful content", long_about = None)]
#[command(version)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env", global = true)]
    dotenv: String,

    /// Minified GraphQL schema used by the result cache.
    #[arg(long, default_value = DEFAULT_SCHEMA_PATH, global = true)]
    schema: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prerender published pages into memory and serve the site (default).
    Serve,

    /// Prerender published pages to HTML files.
    Build {
        /// Output directory (overrides SITE_OUT_DIR).
        #[arg(long, short)]
        out_dir: Option<PathBuf>,
    },

    /// Fetch the GraphQL schema and write its minified form.
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load .env file if it exists
    if Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let client = GraphQlClient::new(config.contentful.clone())?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Schema => {
            let schema = load_schema(&client, &args.schema)
                .await
                .context("failed to load GraphQL schema")?;
            tracing::info!(types = schema.len(), "schema loaded");
            Ok(())
        }
        Command::Build { out_dir } => {
            let out_dir = out_dir.unwrap_or_else(|| config.out_dir.clone());
            let state = app_state(config, client, &args.schema);
            let report = prerender::build_site(&state, &out_dir).await;
            if report.failed > 0 {
                anyhow::bail!("{} pages failed to build", report.failed);
            }
            Ok(())
        }
        Command::Serve => serve(config, client, &args.schema).await,
    }
}

fn app_state(config: Config, client: GraphQlClient, schema_path: &Path) -> AppState {
    let schema = if schema_path.exists() {
        match Schema::from_file(schema_path) {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::warn!(path = %schema_path.display(), error = %e, "ignoring unreadable schema");
                None
            }
        }
    } else {
        tracing::debug!(path = %schema_path.display(), "no schema file, cache keys from rules only");
        None
    };

    let source = ContentfulSource::new(client, schema, config.revalidate);
    AppState::new(config, Arc::new(source))
}

async fn serve(config: Config, client: GraphQlClient, schema_path: &Path) -> anyhow::Result<()> {
    // Initialize metrics
    if let Some(port) = config.metrics_port {
        let handle = init_metrics().context("failed to install metrics recorder")?;
        start_metrics_server(port, handle).await?;
    }

    let bind_addr = config.bind_addr.clone();
    let state = app_state(config, client, schema_path);

    prerender::warm_page_store(&state).await;

    // Build router with middleware
    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting site server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping gracefully...");
}
