use crate::error::EngineError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Engine configuration, usually read from `fortwatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub tuning: TuningConfig,

    /// Webhook destinations
    #[serde(default)]
    pub webhooks: Vec<WebhookDestination>,

    /// Named fences used to tag notifications with areas
    #[serde(default)]
    pub areas: Vec<AreaFence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Process-wide cap on scan results
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// How long an unclassified map fort waits for its classifying message
    #[serde(default = "default_ambiguity_ttl_secs")]
    pub ambiguity_ttl_secs: u64,

    /// Lifetime of a lure module
    #[serde(default = "default_lure_duration_secs")]
    pub lure_duration_secs: i64,

    /// Forts missing from their cell for longer than this are removed; 0 disables
    #[serde(default = "default_stale_fort_threshold_secs")]
    pub stale_fort_threshold_secs: i64,

    /// Pending webhook messages before new ones are dropped
    #[serde(default = "default_webhook_queue_capacity")]
    pub webhook_queue_capacity: usize,

    #[serde(default = "default_webhook_flush_interval_ms")]
    pub webhook_flush_interval_ms: u64,
}

fn default_max_results() -> usize {
    3000
}

fn default_ambiguity_ttl_secs() -> u64 {
    300
}

fn default_lure_duration_secs() -> i64 {
    1800
}

fn default_stale_fort_threshold_secs() -> i64 {
    3600
}

fn default_webhook_queue_capacity() -> usize {
    10_000
}

fn default_webhook_flush_interval_ms() -> u64 {
    1000
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            ambiguity_ttl_secs: default_ambiguity_ttl_secs(),
            lure_duration_secs: default_lure_duration_secs(),
            stale_fort_threshold_secs: default_stale_fort_threshold_secs(),
            webhook_queue_capacity: default_webhook_queue_capacity(),
            webhook_flush_interval_ms: default_webhook_flush_interval_ms(),
        }
    }
}

impl TuningConfig {
    pub fn ambiguity_ttl(&self) -> Duration {
        Duration::from_secs(self.ambiguity_ttl_secs)
    }

    pub fn webhook_flush_interval(&self) -> Duration {
        Duration::from_millis(self.webhook_flush_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDestination {
    pub url: String,

    /// Message types to forward, e.g. `fort_update`. Empty sends every type.
    #[serde(default)]
    pub types: Vec<String>,

    /// `parent/name` filters; `*` matches any parent or name. Empty sends everything.
    #[serde(default)]
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaFence {
    #[serde(default)]
    pub parent: String,
    pub name: String,
    /// `[lat, lon]` vertices
    pub polygon: Vec<[f64; 2]>,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate().map_err(EngineError::Config)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tuning.max_results == 0 {
            return Err("max_results must be > 0".to_string());
        }

        if self.tuning.ambiguity_ttl_secs == 0 {
            return Err("ambiguity_ttl_secs must be > 0".to_string());
        }

        if self.tuning.webhook_queue_capacity == 0 {
            return Err("webhook_queue_capacity must be > 0".to_string());
        }

        if self.tuning.webhook_flush_interval_ms == 0 {
            return Err("webhook_flush_interval_ms must be > 0".to_string());
        }

        if let Some(hook) = self.webhooks.iter().find(|hook| hook.url.trim().is_empty()) {
            return Err(format!("webhook url must not be empty (areas: {:?})", hook.areas));
        }

        if let Some(fence) = self.areas.iter().find(|fence| fence.polygon.len() < 3) {
            return Err(format!("area {} needs at least 3 points", fence.name));
        }

        Ok(())
    }
}
