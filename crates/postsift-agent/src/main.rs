//! Postsift Agent
//!
//! Local moderation sidecar for social posts: resolves post URLs through
//! public mirrors, runs the sequential classifier fallback, and keeps the
//! report log, flagged account store, and failure queue. One binary carries
//! both the HTTP surface and the operator CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use postsift_core::Endpoint;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

mod commands;
mod config;
mod routes;
mod state;

use config::AgentConfig;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "postsift-agent")]
#[command(about = "Postsift moderation agent", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "postsift.yaml", env = "POSTSIFT_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP agent
    Serve {
        /// Listen address
        #[arg(short = 'l', long)]
        listen: Option<String>,

        /// Listen port
        #[arg(short = 'P', long)]
        port: Option<u16>,

        /// Classifier endpoint URL; repeat to set the fallback order
        #[arg(short, long = "endpoint")]
        endpoints: Vec<String>,
    },
    /// Classify one post from the terminal
    Classify {
        /// Post text
        #[arg(short, long)]
        text: Option<String>,

        /// Post URL to extract and classify
        #[arg(short, long)]
        url: Option<String>,

        /// Classifier endpoint URL; repeat to set the fallback order
        #[arg(short, long = "endpoint")]
        endpoints: Vec<String>,
    },
    /// Drain the failure queue and re-process every item
    Retry,
    /// Inspect the report log
    Report {
        /// Print the label distribution instead of records
        #[arg(long)]
        summary: bool,

        /// Filter by label
        #[arg(long)]
        label: Option<String>,

        /// Maximum records to print
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Export matching records to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut config = AgentConfig::load(&cli.config)?;

    match cli.command {
        Command::Serve {
            listen,
            port,
            endpoints,
        } => {
            apply_endpoint_override(&mut config, endpoints);
            if let Some(listen) = listen {
                config.listen = listen;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Command::Classify {
            text,
            url,
            endpoints,
        } => {
            apply_endpoint_override(&mut config, endpoints);
            commands::classify_once(config, text, url).await
        }
        Command::Retry => commands::retry(config).await,
        Command::Report {
            summary,
            label,
            limit,
            export,
        } => commands::report(config, summary, label, limit, export),
    }
}

fn apply_endpoint_override(config: &mut AgentConfig, endpoints: Vec<String>) {
    if !endpoints.is_empty() {
        config.classifier.endpoints = endpoints.into_iter().map(Endpoint::new).collect();
    }
}

/// Run the HTTP agent until a shutdown signal arrives
async fn serve(config: AgentConfig) -> Result<()> {
    info!("Starting Postsift agent");

    if config.classifier.endpoints.is_empty() {
        anyhow::bail!(
            "no classifier endpoints configured; set classifier.endpoints in the config file or pass --endpoint"
        );
    }

    let metrics_handle = init_metrics()?;
    let state = AppState::new(config.clone(), metrics_handle)?;

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Agent listening on http://{}", addr);
    info!(
        "Classifier endpoints: {}, mirrors: {}",
        config.classifier.endpoints.len(),
        config.extract.mirrors.len()
    );

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("postsift=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postsift=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "postsift_classify_requests_total",
        "Total classification requests received"
    );
    metrics::describe_counter!(
        "postsift_attempts_total",
        "Classifier endpoint attempts by endpoint and outcome"
    );
    metrics::describe_counter!(
        "postsift_exhaustions_total",
        "Fallback passes that exhausted every configured endpoint"
    );
    metrics::describe_counter!(
        "postsift_mirror_failures_total",
        "Mirror fetches that failed or did not parse"
    );
    metrics::describe_counter!(
        "postsift_extract_failures_total",
        "Posts whose text no mirror could serve"
    );
    metrics::describe_histogram!(
        "postsift_classify_latency_ms",
        metrics::Unit::Milliseconds,
        "Winning attempt latency in milliseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
