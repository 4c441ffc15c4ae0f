// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use proposal_desk_core::domain::service_config::{MessagingKind, ServiceConfigManifest, StorageKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./proposal-desk.yaml)
        #[arg(short, long, default_value = "./proposal-desk.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(&output, examples, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. PDESK_CONFIG_PATH: {}",
            std::env::var("PDESK_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./proposal-desk.yaml");
        println!("  4. ~/.proposal-desk/config.yaml");
        println!("  5. /etc/proposal-desk/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let spec = &config.spec;

    println!("{}", "HTTP:".bold());
    println!("  Listen: {}:{}", spec.http.bind_address, spec.http.port);
    println!();

    println!("{}", "Storage:".bold());
    match spec.storage.backend {
        StorageKind::InMemory => println!("  Backend: in-memory {}", "(data is lost on restart)".dimmed()),
        StorageKind::Postgres => {
            println!("  Backend: postgres");
            println!(
                "  Database URL: {}",
                spec.storage
                    .database_url
                    .as_deref()
                    .map(redact_url)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  Max connections: {}", spec.storage.max_connections);
        }
    }
    println!();

    println!("{}", "Messaging:".bold());
    println!("  Topic: {}", spec.messaging.topic);
    match spec.messaging.backend {
        MessagingKind::InProcess => {
            println!("  Backend: in-process (capacity {})", spec.messaging.bus_capacity)
        }
        MessagingKind::Webhook => {
            println!("  Backend: webhook");
            if let Some(webhook) = &spec.messaging.webhook {
                println!("  Endpoint: {}", webhook.endpoint);
                println!("  Timeout: {}ms", webhook.timeout_ms);
            }
        }
    }
    println!();

    println!("{}", "Lifecycle:".bold());
    println!("  Transition policy: {:?}", spec.lifecycle.transition_policy);
    println!();

    println!("{}", "Observability:".bold());
    println!(
        "  Logs: {} ({})",
        spec.observability.log_level, spec.observability.log_format
    );
    if spec.observability.metrics.enabled {
        println!("  Metrics: enabled on port {}", spec.observability.metrics.port);
    } else {
        println!("  Metrics: {}", "disabled".dimmed());
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

/// Hide the password of a connection string; `env:` references are shown as is.
fn redact_url(url: &str) -> String {
    if let Some((scheme, rest)) = url.split_once("://") {
        if let Some((credentials, host)) = rest.split_once('@') {
            let user = credentials.split(':').next().unwrap_or_default();
            return format!("{}://{}:****@{}", scheme, user, host);
        }
    }
    url.to_string()
}
