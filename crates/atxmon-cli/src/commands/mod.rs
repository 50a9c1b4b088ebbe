//! Command handler modules for the atxmon CLI.
//!
//! Shared wiring (config -> settings -> backend -> client) lives here.
//! Command-specific logic lives in the submodules.

pub mod check;
pub mod inspect;

use std::time::Duration;

use anyhow::{Context as _, Result};
use atxmon_config::{
    report_unused_keys, resolve_es_credentials, CliOverrides, EnvOverrides, LoadedConfig,
    MonitorSettings, UnusedKeyPolicy,
};
use atxmon_monitor::EpochLayout;
use atxmon_query::{BasicAuth, ElasticsearchBackend, ElasticsearchOptions, QueryClient};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    atxmon_config::load_layered_yaml(&path_refs)
}

/// Index name for this run: explicit setting, else `<prefix><YYYY.MM.DD>` of `now`.
///
/// An epoch that straddles UTC midnight spans two daily indices; pass an
/// explicit `--index` pattern (e.g. `kubernetes_cluster-*`) in that case.
pub fn resolve_index(settings: &MonitorSettings, now: DateTime<Utc>) -> String {
    match &settings.index {
        Some(idx) => idx.clone(),
        None => format!("{}{}", settings.index_prefix, now.format("%Y.%m.%d")),
    }
}

/// Everything a command needs to talk to the backend.
pub struct Context {
    pub settings: MonitorSettings,
    pub config_hash: String,
    pub index: String,
    pub layout: EpochLayout,
    backend_opts: ElasticsearchOptions,
}

impl Context {
    pub fn load(config_paths: &[String], cli: &CliOverrides) -> Result<Self> {
        let loaded = load_config(config_paths)?;

        let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
        for ptr in &unused.pointers {
            warn!(pointer = %ptr, "unused config key");
        }

        let settings = MonitorSettings::resolve(&loaded.config_json, &EnvOverrides::from_env(), cli)?;

        let layout = EpochLayout::new(settings.layers_per_epoch)?;
        let index = resolve_index(&settings, Utc::now());

        let auth = resolve_es_credentials(&loaded.config_json)?.map(|c| BasicAuth {
            username: c.username,
            password: c.password,
        });
        let backend_opts = ElasticsearchOptions {
            page_size: settings.page_size,
            scroll_keepalive: settings.scroll_keepalive.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            auth,
        };

        info!(
            es_url = %settings.es_url,
            index = %index,
            layers_per_epoch = settings.layers_per_epoch,
            config_hash = %loaded.config_hash,
            "atxmon configured"
        );

        Ok(Self {
            settings,
            config_hash: loaded.config_hash,
            index,
            layout,
            backend_opts,
        })
    }

    /// A client scoped to `namespace`.
    pub fn client(&self, namespace: String) -> Result<QueryClient> {
        let backend =
            ElasticsearchBackend::with_options(self.settings.es_url.clone(), self.backend_opts.clone())
                .context("elasticsearch backend init failed")?;
        Ok(QueryClient::new(Box::new(backend), self.index.clone(), namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn index_defaults_to_prefix_plus_utc_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 0).unwrap();
        let s = MonitorSettings::default();
        assert_eq!(resolve_index(&s, now), "kubernetes_cluster-2024.01.05");

        let s = MonitorSettings {
            index: Some("logs-*".to_string()),
            ..MonitorSettings::default()
        };
        assert_eq!(resolve_index(&s, now), "logs-*");
    }
}
