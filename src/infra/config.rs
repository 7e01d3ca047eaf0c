//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::calendar::Calendar;
use crate::domain::tracking::TrackingGrammar;
use anyhow::{bail, Context};
use chrono::FixedOffset;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Prefix of `PREFIX-YYYYMMDD-NNNNN` numbers
    #[serde(default = "default_dated_prefix")]
    pub dated_prefix: String,
    /// Prefix of `PREFIX-NNNNNNNN` numbers
    #[serde(default = "default_opaque_prefix")]
    pub opaque_prefix: String,
    /// Whitelisted number that resolves to a fixed historical shipment
    #[serde(default = "default_demo_tracking_number")]
    pub demo_tracking_number: String,
    /// Calendar used for dated numbers; unset means the host time zone
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Retries when an allocated number is already stored
    #[serde(default = "default_max_allocation_attempts")]
    pub max_allocation_attempts: u32,
}

fn default_dated_prefix() -> String {
    "GSS".to_string()
}

fn default_opaque_prefix() -> String {
    "SHPEX".to_string()
}

fn default_demo_tracking_number() -> String {
    "GSS1234567890".to_string()
}

fn default_max_allocation_attempts() -> u32 {
    8
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dated_prefix: default_dated_prefix(),
            opaque_prefix: default_opaque_prefix(),
            demo_tracking_number: default_demo_tracking_number(),
            utc_offset_minutes: None,
            max_allocation_attempts: default_max_allocation_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Synthetic shipments placed in the repository at startup
    #[serde(default = "default_seed_shipments")]
    pub seed_shipments: usize,
}

fn default_seed_shipments() -> usize {
    5
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { seed_shipments: default_seed_shipments() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
    /// Serve GET /metrics
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

fn default_metrics_interval() -> u64 {
    60
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval(), enabled: default_metrics_enabled() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    dated_prefix: String,
    opaque_prefix: String,
    demo_tracking_number: String,
    utc_offset_minutes: Option<i32>,
    max_allocation_attempts: u32,
    seed_shipments: usize,
    metrics_interval_secs: u64,
    metrics_enabled: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            dated_prefix: toml_config.tracking.dated_prefix,
            opaque_prefix: toml_config.tracking.opaque_prefix,
            demo_tracking_number: toml_config.tracking.demo_tracking_number,
            utc_offset_minutes: toml_config.tracking.utc_offset_minutes,
            max_allocation_attempts: toml_config.tracking.max_allocation_attempts,
            seed_shipments: toml_config.demo.seed_shipments,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            metrics_enabled: toml_config.metrics.enabled,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| format!("Failed to parse config file {source}"))?;
        let config = Self::from_toml(toml_config, source.to_string());
        config.validate().with_context(|| format!("Invalid config file {source}"))?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    /// Load from an explicit path, falling back to defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, prefix) in [("dated_prefix", &self.dated_prefix), ("opaque_prefix", &self.opaque_prefix)] {
            if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                bail!("tracking.{name} must be non-empty ASCII alphanumeric, got {prefix:?}");
            }
        }
        if self.dated_prefix == self.opaque_prefix {
            bail!("tracking.dated_prefix and tracking.opaque_prefix must differ");
        }
        if self.demo_tracking_number.is_empty() {
            bail!("tracking.demo_tracking_number must not be empty");
        }
        // Opaque numbers are matched first, so such a demo number is unreachable
        if self.grammar().parse_opaque(&self.demo_tracking_number).is_some() {
            bail!(
                "tracking.demo_tracking_number {:?} must not match the opaque format",
                self.demo_tracking_number
            );
        }
        if let Some(minutes) = self.utc_offset_minutes {
            if FixedOffset::east_opt(minutes.saturating_mul(60)).is_none() {
                bail!("tracking.utc_offset_minutes out of range: {minutes}");
            }
        }
        if self.max_allocation_attempts == 0 {
            bail!("tracking.max_allocation_attempts must be at least 1");
        }
        if self.metrics_interval_secs == 0 {
            bail!("metrics.interval_secs must be at least 1");
        }
        Ok(())
    }

    /// Tracking number grammar built from the configured prefixes
    pub fn grammar(&self) -> TrackingGrammar {
        TrackingGrammar::new(&self.dated_prefix, &self.opaque_prefix, &self.demo_tracking_number)
    }

    /// Calendar for dated numbers: the configured offset, else the host time zone
    pub fn calendar(&self) -> Calendar {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes.saturating_mul(60)))
            .map_or(Calendar::Local, Calendar::Fixed)
    }

    /// `bind_address:port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    // Getters for all config fields
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn dated_prefix(&self) -> &str {
        &self.dated_prefix
    }

    pub fn opaque_prefix(&self) -> &str {
        &self.opaque_prefix
    }

    pub fn demo_tracking_number(&self) -> &str {
        &self.demo_tracking_number
    }

    pub fn utc_offset_minutes(&self) -> Option<i32> {
        self.utc_offset_minutes
    }

    pub fn max_allocation_attempts(&self) -> u32 {
        self.max_allocation_attempts
    }

    pub fn seed_shipments(&self) -> usize {
        self.seed_shipments
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to pin the calendar
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    /// Builder method for tests to control startup seeding
    pub fn with_seed_shipments(mut self, count: usize) -> Self {
        self.seed_shipments = count;
        self
    }
}
