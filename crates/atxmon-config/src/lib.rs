//! atxmon-config
//!
//! Layered YAML configuration for the monitor.
//!
//! - docs are overlaid in order (earlier = base, later = override) into JSON
//! - the merged document is canonicalized and hashed so every report can name
//!   the exact config it ran with
//! - secrets are never literal values: YAML holds env var NAMES only
//!   (see [`secrets`])
//! - typed settings with defaults and env overrides live in [`settings`]

pub mod secrets;
pub mod settings;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;

pub use secrets::{resolve_es_credentials, ResolvedCredentials};
pub use settings::{CliOverrides, EnvOverrides, MonitorSettings, ENV_ES_URL, ENV_INDEX};

/// If any leaf string value in the effective config starts with one of these,
/// loading aborts with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "ApiKey ",    // Elasticsearch API key header value
    "Basic ",     // pre-encoded basic auth header
    "Bearer ",    // bearer tokens
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
];

/// Config keys the monitor reads, as path segments.
///
/// Everything below one of these is consumed; any other leaf is unused.
/// Keep in sync with `settings.rs` and `secrets.rs`.
pub const CONSUMED_KEYS: &[&[&str]] = &[
    &["elasticsearch", "url"],
    &["elasticsearch", "index"],
    &["elasticsearch", "index_prefix"],
    &["elasticsearch", "page_size"],
    &["elasticsearch", "scroll_keepalive"],
    &["elasticsearch", "request_timeout_secs"],
    &["elasticsearch", "auth", "username_env"],
    &["elasticsearch", "auth", "password_env"],
    &["network", "layers_per_epoch"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

/// Config leaves nothing in the monitor reads, as sorted JSON pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnusedKeys {
    pub pointers: Vec<String>,
}

impl UnusedKeys {
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}

/// List unused config leaves; under [`UnusedKeyPolicy::Fail`] any hit is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeys> {
    let mut pointers = Vec::new();
    walk_leaves(config_json, &mut Vec::new(), &mut |path, _| {
        if !is_consumed(path) {
            pointers.push(json_pointer(path));
        }
    });
    pointers.sort();

    if policy == UnusedKeyPolicy::Fail && !pointers.is_empty() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config key(s): {}",
            pointers.len(),
            pointers.join(", ")
        );
    }
    Ok(UnusedKeys { pointers })
}

fn is_consumed(path: &[String]) -> bool {
    CONSUMED_KEYS.iter().any(|key| {
        key.len() <= path.len() && key.iter().zip(path).all(|(k, seg)| *k == seg.as_str())
    })
}

/// RFC 6901 rendering of a path.
fn json_pointer(path: &[String]) -> String {
    path.iter()
        .map(|seg| format!("/{}", seg.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Visit every scalar (or empty container) below `v` with its path.
fn walk_leaves(v: &Value, path: &mut Vec<String>, visit: &mut dyn FnMut(&[String], &Value)) {
    let children: Vec<(String, &Value)> = match v {
        Value::Object(map) if !map.is_empty() => {
            map.iter().map(|(k, child)| (k.clone(), child)).collect()
        }
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .enumerate()
            .map(|(i, child)| (i.to_string(), child))
            .collect(),
        _ => {
            if !path.is_empty() {
                visit(path, v);
            }
            return;
        }
    };
    for (seg, child) in children {
        path.push(seg);
        walk_leaves(child, path, visit);
        path.pop();
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// sha256 of `canonical_json`, hex.
    pub config_hash: String,
    /// Merged config, keys sorted, no whitespace.
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    fn from_merged(config_json: Value) -> Result<Self> {
        reject_secret_literals(&config_json)?;
        // serde_json's default Map is a BTreeMap, so keys serialize sorted.
        let canonical_json =
            serde_json::to_string(&config_json).context("config canonical serialize failed")?;
        let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
        Ok(Self {
            config_hash,
            canonical_json,
            config_json,
        })
    }
}

/// Read and overlay config files in the given order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read config layer {p}")))
        .collect::<Result<Vec<String>>>()?;
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&docs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i}: invalid yaml"))?;
        // Empty document: nothing to overlay.
        if layer.is_null() {
            continue;
        }
        let layer = serde_json::to_value(layer)
            .with_context(|| format!("config layer {i}: not representable as json"))?;
        overlay(&mut merged, layer);
    }
    LoadedConfig::from_merged(merged)
}

/// Objects merge key by key; any other value replaces what is below it.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                match base_map.get_mut(&k) {
                    Some(slot) => overlay(slot, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    let mut hit: Option<String> = None;
    walk_leaves(v, &mut Vec::new(), &mut |path, leaf| {
        if hit.is_none() && leaf.as_str().is_some_and(looks_like_secret) {
            hit = Some(json_pointer(path));
        }
    });
    match hit {
        Some(ptr) => bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED"),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim_start();
    if t.len() < 8 {
        return false;
    }
    // URLs with embedded userinfo carry a password in clear.
    if let Some(rest) = t.strip_prefix("http://").or_else(|| t.strip_prefix("https://")) {
        let authority = rest.split('/').next().unwrap_or("");
        if authority.contains('@') {
            return true;
        }
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segs: &[&str]) -> Vec<String> {
        segs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn consumed_keys_match_whole_segments() {
        assert!(is_consumed(&path(&["elasticsearch", "url"])));
        assert!(is_consumed(&path(&["elasticsearch", "auth", "username_env"])));
        assert!(!is_consumed(&path(&["elasticsearch", "urls"])));
        assert!(!is_consumed(&path(&["elasticsearch"])));
        assert!(!is_consumed(&path(&["elasticsearch", "auth", "token_env"])));
    }

    #[test]
    fn pointers_escape_slash_and_tilde() {
        assert_eq!(json_pointer(&path(&["a/b", "c~d", "0"])), "/a~1b/c~0d/0");
    }

    #[test]
    fn overlay_merges_objects_and_replaces_the_rest() {
        let mut base = json!({ "es": { "url": "a", "page_size": 1 }, "list": [1, 2] });
        overlay(&mut base, json!({ "es": { "url": "b" }, "list": [3], "new": true }));
        assert_eq!(
            base,
            json!({ "es": { "url": "b", "page_size": 1 }, "list": [3], "new": true })
        );
    }

    #[test]
    fn url_with_userinfo_is_secret() {
        assert!(looks_like_secret("https://elastic:pw@es.internal:9200"));
        assert!(!looks_like_secret("https://es.internal:9200/path@x"));
        assert!(!looks_like_secret("http://localhost:9200"));
    }

    #[test]
    fn empty_docs_are_ignored() {
        let loaded = load_layered_yaml_from_strings(&["", "network:\n  layers_per_epoch: 3\n"]).unwrap();
        assert_eq!(loaded.config_json.pointer("/network/layers_per_epoch"), Some(&json!(3)));
    }
}
