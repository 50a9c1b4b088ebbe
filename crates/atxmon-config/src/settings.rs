//! Typed monitor settings with defaults.
//!
//! Precedence (lowest to highest): built-in defaults, layered YAML, env
//! overrides, explicit CLI flags (applied by the caller).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const ENV_ES_URL: &str = "ATXMON_ES_URL";
pub const ENV_INDEX: &str = "ATXMON_INDEX";

pub const DEFAULT_ES_URL: &str = "http://localhost:9200";
pub const DEFAULT_INDEX_PREFIX: &str = "kubernetes_cluster-";
pub const DEFAULT_LAYERS_PER_EPOCH: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub es_url: String,
    /// Explicit index (or pattern). `None` means the caller derives it from
    /// `index_prefix` and the current date.
    pub index: Option<String>,
    pub index_prefix: String,
    pub page_size: usize,
    pub scroll_keepalive: String,
    pub request_timeout_secs: u64,
    pub layers_per_epoch: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            es_url: DEFAULT_ES_URL.to_string(),
            index: None,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            page_size: 1000,
            scroll_keepalive: "1m".to_string(),
            request_timeout_secs: 30,
            layers_per_epoch: DEFAULT_LAYERS_PER_EPOCH,
        }
    }
}

/// Env values that override the YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub es_url: Option<String>,
    pub index: Option<String>,
}

impl EnvOverrides {
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            es_url: get(ENV_ES_URL),
            index: get(ENV_INDEX),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }
}

/// Explicit CLI flag values; highest precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub es_url: Option<String>,
    pub index: Option<String>,
    pub layers_per_epoch: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    elasticsearch: RawElasticsearch,
    #[serde(default)]
    network: RawNetwork,
}

#[derive(Debug, Default, Deserialize)]
struct RawElasticsearch {
    url: Option<String>,
    index: Option<String>,
    index_prefix: Option<String>,
    page_size: Option<usize>,
    scroll_keepalive: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNetwork {
    layers_per_epoch: Option<u64>,
}

impl MonitorSettings {
    /// Full precedence chain, validated once at the end.
    pub fn resolve(config_json: &Value, env: &EnvOverrides, cli: &CliOverrides) -> Result<Self> {
        let s = Self::from_config(config_json, env)?.with_cli_overrides(cli);
        s.validate()?;
        Ok(s)
    }

    /// Build settings from merged config JSON plus env overrides.
    ///
    /// Not validated: CLI flags may still replace a bad value. Unknown keys
    /// are ignored here; see `report_unused_keys`.
    pub fn from_config(config_json: &Value, env: &EnvOverrides) -> Result<Self> {
        let raw: RawConfig =
            serde_json::from_value(config_json.clone()).context("config does not match monitor schema")?;
        let d = MonitorSettings::default();

        Ok(MonitorSettings {
            es_url: env.es_url.clone().or(raw.elasticsearch.url).unwrap_or(d.es_url),
            index: env.index.clone().or(raw.elasticsearch.index),
            index_prefix: raw.elasticsearch.index_prefix.unwrap_or(d.index_prefix),
            page_size: raw.elasticsearch.page_size.unwrap_or(d.page_size),
            scroll_keepalive: raw.elasticsearch.scroll_keepalive.unwrap_or(d.scroll_keepalive),
            request_timeout_secs: raw
                .elasticsearch
                .request_timeout_secs
                .unwrap_or(d.request_timeout_secs),
            layers_per_epoch: raw.network.layers_per_epoch.unwrap_or(d.layers_per_epoch),
        })
    }

    pub fn with_cli_overrides(mut self, cli: &CliOverrides) -> Self {
        if let Some(url) = &cli.es_url {
            self.es_url = url.clone();
        }
        if let Some(idx) = &cli.index {
            self.index = Some(idx.clone());
        }
        if let Some(n) = cli.layers_per_epoch {
            self.layers_per_epoch = n;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.es_url.trim().is_empty() {
            bail!("CONFIG_INVALID: elasticsearch.url must not be empty");
        }
        if self.page_size == 0 {
            bail!("CONFIG_INVALID: elasticsearch.page_size must be > 0");
        }
        if self.request_timeout_secs == 0 {
            bail!("CONFIG_INVALID: elasticsearch.request_timeout_secs must be > 0");
        }
        if self.layers_per_epoch == 0 {
            bail!("CONFIG_INVALID: network.layers_per_epoch must be > 0");
        }
        Ok(())
    }
}
