//! # CLI Interface
//!
//! Defines the command-line argument structure for `star-registry-node`
//! using `clap` derive. Supports two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Star registry node.
///
/// Serves an in-memory, hash-linked registry of wallet-owned stars over
/// HTTP. The chain is not persisted: every start begins from genesis.
#[derive(Parser, Debug)]
#[command(
    name = "star-registry-node",
    about = "Private star registry blockchain node",
    version,
    propagate_version = true
)]
pub struct StarRegistryCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and serve the HTTP API.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Interface to bind the API and metrics listeners to.
    #[arg(long, env = "STAR_REGISTRY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port for the REST API.
    #[arg(long, short = 'p', env = "STAR_REGISTRY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "STAR_REGISTRY_METRICS_PORT", default_value_t = 9100)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "STAR_REGISTRY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Seconds a signed ownership challenge remains acceptable.
    #[arg(
        long,
        env = "STAR_REGISTRY_VALIDATION_WINDOW",
        default_value_t = star_registry::config::DEFAULT_VALIDATION_WINDOW_SECS
    )]
    pub validation_window: u64,
}
