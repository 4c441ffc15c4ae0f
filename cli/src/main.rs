// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Proposal Desk CLI
//!
//! The `pdesk` binary runs the Proposal Desk HTTP server and drives a running
//! server from the command line.
//!
//! ## Commands
//!
//! - `pdesk serve` - Run the HTTP API in the foreground
//! - `pdesk proposal create|get|list|set-status|approve` - Proposal operations
//! - `pdesk contract issue|show|check` - Contract operations
//! - `pdesk config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use proposal_desk_core::domain::service_config::ServiceConfigManifest;

mod client;
mod commands;
mod server;

use commands::{ConfigCommand, ContractCommand, ProposalCommand};

/// Proposal Desk - Insurance proposal lifecycle and contracting
#[derive(Parser)]
#[command(name = "pdesk")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "PDESK_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Base URL of a running server (default: derived from spec.http)
    #[arg(long, global = true, env = "PDESK_URL")]
    url: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides spec.observability.log_level
    #[arg(long, global = true, env = "PDESK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json); overrides spec.observability.log_format
    #[arg(long, global = true, env = "PDESK_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    #[command(name = "serve")]
    Serve {
        /// Port to listen on (overrides spec.http.port)
        #[arg(long, env = "PDESK_PORT")]
        port: Option<u16>,

        /// Address to bind (overrides spec.http.bind_address)
        #[arg(long, env = "PDESK_BIND")]
        bind: Option<String>,
    },

    /// Proposal operations
    #[command(name = "proposal")]
    Proposal {
        #[command(subcommand)]
        command: ProposalCommand,
    },

    /// Contract operations
    #[command(name = "contract")]
    Contract {
        #[command(subcommand)]
        command: ContractCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    };

    match command {
        // Config commands inspect files that may not load; do not require one up front.
        Commands::Config { command } => {
            init_logging(
                cli.log_level.as_deref().unwrap_or("warn"),
                cli.log_format.as_deref().unwrap_or("text"),
            )?;
            commands::config::handle_command(command, cli.config).await
        }
        Commands::Serve { port, bind } => {
            let config = load_config(&cli.config, &cli.log_level, &cli.log_format)?;
            server::start_server(config, bind, port).await
        }
        Commands::Proposal { command } => {
            let config = load_config(&cli.config, &cli.log_level, &cli.log_format)?;
            let base_url = cli.url.unwrap_or_else(|| client::default_base_url(&config));
            commands::proposal::handle_command(command, &base_url).await
        }
        Commands::Contract { command } => {
            let config = load_config(&cli.config, &cli.log_level, &cli.log_format)?;
            let base_url = cli.url.unwrap_or_else(|| client::default_base_url(&config));
            commands::contract::handle_command(command, &base_url).await
        }
    }
}

/// Load configuration and start logging with its observability settings;
/// command-line flags take precedence.
fn load_config(
    path: &Option<PathBuf>,
    log_level: &Option<String>,
    log_format: &Option<String>,
) -> Result<ServiceConfigManifest> {
    let config = ServiceConfigManifest::load_or_default(path.clone())
        .context("Failed to load configuration")?;
    let observability = &config.spec.observability;
    init_logging(
        log_level.as_deref().unwrap_or(&observability.log_level),
        log_format.as_deref().unwrap_or(&observability.log_format),
    )?;
    Ok(config)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
