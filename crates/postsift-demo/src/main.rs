//! Postsift Demo
//!
//! Stub classifier service plus smoke traffic for exercising the fallback
//! client without real model endpoints.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod labeler;
mod smoke;
mod stub;

#[derive(Parser, Debug)]
#[command(name = "postsift-demo")]
#[command(about = "Stub classifier and fallback smoke traffic", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one stub classifier service
    Stub {
        /// Listen address
        #[arg(short = 'l', long, default_value = "127.0.0.1")]
        listen: String,

        /// Listen port
        #[arg(short = 'P', long, default_value = "9100")]
        port: u16,

        /// Display name used in logs
        #[arg(long, default_value = "stub")]
        name: String,

        /// Probability of an application-level error body (0.0 - 1.0)
        #[arg(long, default_value_t = 0.0)]
        error_rate: f64,

        /// Probability of a plain HTTP 500 (0.0 - 1.0)
        #[arg(long, default_value_t = 0.0)]
        http_error_rate: f64,

        /// Fixed delay before every answer, for timeout drills
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Drive the fallback client against one or more stubs
    Smoke {
        /// Classifier endpoint URL; repeat to set the fallback order
        #[arg(short, long = "endpoint")]
        endpoints: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Stub {
            listen,
            port,
            name,
            error_rate,
            http_error_rate,
            delay_ms,
        } => {
            let faults = stub::FaultConfig {
                error_rate,
                http_error_rate,
                delay_ms,
            };
            let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
            stub::run_stub(addr, name, faults).await
        }
        Command::Smoke { endpoints } => smoke::run_smoke(endpoints).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "postsift=debug,tower_http=debug"
    } else {
        "postsift=info,tower_http=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
