//! scenario_credentials
//!
//! Credential resolution is names-in-config, values-from-env, fail closed.
//! Env access goes through an injected lookup so no test mutates the process
//! environment.

use std::collections::HashMap;

use atxmon_config::load_layered_yaml_from_strings;
use atxmon_config::secrets::resolve_es_credentials_with;

const WITH_AUTH: &str = r#"
elasticsearch:
  auth:
    username_env: "ATXMON_TEST_ES_USER"
    password_env: "ATXMON_TEST_ES_PASS"
"#;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn no_auth_section_means_anonymous() {
    let cfg = load_layered_yaml_from_strings(&["elasticsearch:\n  url: \"http://localhost:9200\"\n"])
        .unwrap()
        .config_json;
    assert_eq!(resolve_es_credentials_with(&cfg, lookup(&[])).unwrap(), None);
}

#[test]
fn both_vars_resolve() {
    let cfg = load_layered_yaml_from_strings(&[WITH_AUTH]).unwrap().config_json;
    let creds = resolve_es_credentials_with(
        &cfg,
        lookup(&[("ATXMON_TEST_ES_USER", "monitor"), ("ATXMON_TEST_ES_PASS", "s3cr3t-value")]),
    )
    .unwrap()
    .expect("credentials");

    assert_eq!(creds.username, "monitor");
    assert_eq!(creds.password, "s3cr3t-value");
    assert!(!format!("{creds:?}").contains("s3cr3t-value"));
}

#[test]
fn missing_password_fails_closed_naming_the_var() {
    let cfg = load_layered_yaml_from_strings(&[WITH_AUTH]).unwrap().config_json;
    let err = resolve_es_credentials_with(
        &cfg,
        lookup(&[("ATXMON_TEST_ES_USER", "monitor"), ("ATXMON_TEST_ES_PASS", "  ")]),
    )
    .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("SECRETS_MISSING"));
    assert!(msg.contains("ATXMON_TEST_ES_PASS"));
    assert!(!msg.contains("monitor"));
}

#[test]
fn half_configured_auth_is_rejected() {
    let cfg = load_layered_yaml_from_strings(&["elasticsearch:\n  auth:\n    username_env: \"ATXMON_TEST_ES_USER\"\n"])
        .unwrap()
        .config_json;
    let err = resolve_es_credentials_with(&cfg, lookup(&[("ATXMON_TEST_ES_USER", "monitor")])).unwrap_err();
    assert!(err.to_string().contains("SECRETS_INCOMPLETE"));
}
