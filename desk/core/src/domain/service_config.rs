// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a Proposal Desk service, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP listener settings
// - Storage backend selection (in-memory or PostgreSQL)
// - Messaging backend selection (in-process bus or webhook)
// - Lifecycle transition policy
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::events::STATUS_TOPIC;
use crate::domain::proposal::TransitionPolicy;
use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "proposal-desk/v1";
pub const KIND: &str = "ServiceConfig";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "proposal-desk/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Service configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    /// Connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingKind {
    #[default]
    InProcess,
    Webhook,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default)]
    pub backend: MessagingKind,

    #[serde(default = "default_topic")]
    pub topic: String,

    /// Buffer size of the in-process event bus
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub endpoint: String,

    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: String, // "text" or "json"

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_max_connections() -> u32 {
    5
}

fn default_topic() -> String {
    STATUS_TOPIC.to_string()
}

fn default_bus_capacity() -> usize {
    1000
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9091
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            backend: MessagingKind::default(),
            topic: default_topic(),
            bus_capacity: default_bus_capacity(),
            webhook: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "proposal-desk".to_string(),
                version: None,
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

/// Resolve "env:VAR_NAME" references, leaving literal values untouched.
fn resolve_env_reference(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| anyhow::anyhow!("Environment variable '{}' is not set", var)),
        None => Ok(value.to_string()),
    }
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. PDESK_CONFIG_PATH environment variable
    /// 2. ./proposal-desk.yaml (working directory)
    /// 3. ~/.proposal-desk/config.yaml (user home)
    /// 4. /etc/proposal-desk/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PDESK_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./proposal-desk.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".proposal-desk").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/proposal-desk/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                tracing::info!("Environment override: DATABASE_URL (storage backend set to postgres)");
                self.spec.storage.backend = StorageKind::Postgres;
                self.spec.storage.database_url = Some(url);
            }
        }

        if let Ok(endpoint) = std::env::var("PDESK_WEBHOOK_URL") {
            if !endpoint.is_empty() {
                tracing::info!("Environment override: PDESK_WEBHOOK_URL={}", endpoint);
                self.spec.messaging.backend = MessagingKind::Webhook;
                let timeout_ms = self
                    .spec
                    .messaging
                    .webhook
                    .as_ref()
                    .map(|w| w.timeout_ms)
                    .unwrap_or_else(default_webhook_timeout_ms);
                self.spec.messaging.webhook = Some(WebhookConfig { endpoint, timeout_ms });
            }
        }

        if let Ok(val) = std::env::var("PDESK_TRANSITION_POLICY") {
            match val.to_lowercase().as_str() {
                "permissive" => self.spec.lifecycle.transition_policy = TransitionPolicy::Permissive,
                "strict" => self.spec.lifecycle.transition_policy = TransitionPolicy::Strict,
                _ => {
                    tracing::warn!(
                        "Invalid value for PDESK_TRANSITION_POLICY: '{}'. Expected permissive/strict. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.http.port == 0 {
            anyhow::bail!("spec.http.port must be non-zero");
        }

        if self.spec.storage.backend == StorageKind::Postgres {
            match &self.spec.storage.database_url {
                Some(url) if !url.is_empty() => {}
                _ => anyhow::bail!("spec.storage.database_url is required for the postgres backend"),
            }
            if self.spec.storage.max_connections == 0 {
                anyhow::bail!("spec.storage.max_connections must be at least 1");
            }
        }

        if self.spec.messaging.topic.is_empty() {
            anyhow::bail!("spec.messaging.topic cannot be empty");
        }

        match self.spec.messaging.backend {
            MessagingKind::InProcess => {
                if self.spec.messaging.bus_capacity == 0 {
                    anyhow::bail!("spec.messaging.bus_capacity must be at least 1");
                }
            }
            MessagingKind::Webhook => match &self.spec.messaging.webhook {
                Some(webhook) if !webhook.endpoint.is_empty() => {
                    if !(webhook.endpoint.starts_with("http://") || webhook.endpoint.starts_with("https://")) {
                        anyhow::bail!(
                            "spec.messaging.webhook.endpoint must be an http(s) URL: {}",
                            webhook.endpoint
                        );
                    }
                }
                _ => anyhow::bail!("spec.messaging.webhook.endpoint is required for the webhook backend"),
            },
        }

        if !matches!(self.spec.observability.log_format.as_str(), "text" | "json") {
            anyhow::bail!(
                "Invalid observability.log_format: '{}'. Expected text or json",
                self.spec.observability.log_format
            );
        }

        Ok(())
    }

    /// Storage backend selected by this configuration, with env references resolved
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageKind::InMemory => Ok(StorageBackend::InMemory),
            StorageKind::Postgres => {
                let raw = self
                    .spec
                    .storage
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("spec.storage.database_url is not set"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_env_reference(raw)?,
                    max_connections: self.spec.storage.max_connections,
                }))
            }
        }
    }
}
