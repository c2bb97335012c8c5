//! Startup wiring shared by the stdio and HTTP binaries.

use std::sync::Arc;

use capsule_care_client::config::Config;
use capsule_care_client::http_client::ReqwestCapsuleCareClient;
use capsule_care_mcp::{CapsuleCareMcpHandler, logging};

#[test]
fn log_level_prefers_own_variable() {
    let level = logging::log_level_from(|key| match key {
        "CAPSULECARE_LOG_LEVEL" => Some("trace".to_string()),
        "RUST_LOG" => Some("warn".to_string()),
        _ => None,
    });
    assert_eq!(level, "trace");
}

#[test]
fn combined_filter_builds() {
    let filter = logging::env_filter("debug");
    assert!(format!("{}", filter).contains("rmcp=warn"));
}

#[test]
fn invalid_filter_falls_back_to_info() {
    let filter = logging::env_filter("invalid[[[filter");
    let rendered = format!("{}", filter);
    assert!(rendered.contains("info"), "{rendered}");
}

#[test]
fn config_defaults_without_env() {
    let config = Config::from_env_with(|_| None).expect("defaults");
    assert_eq!(config.base_url, "http://localhost:5000/api");
    assert!(config.credentials.is_none());
}

#[test]
fn lone_username_is_a_config_error() {
    let result = Config::from_env_with(|key| {
        (key == "CAPSULECARE_USERNAME").then(|| "alice".to_string())
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn handler_initialization_from_config() {
    let config = Config::from_env_with(|key| match key {
        "CAPSULECARE_BASE_URL" => Some("http://127.0.0.1:5000/api".to_string()),
        "CAPSULECARE_TOKEN" => Some("tok".to_string()),
        _ => None,
    })
    .expect("config");
    let client = ReqwestCapsuleCareClient::from_config(&config).expect("client");
    assert!(client.session().is_authenticated());

    let handler = CapsuleCareMcpHandler::new(Arc::new(client))
        .with_history_max_pages(config.history_max_pages);
    assert!(handler.tool_count() > 0);
    assert!(handler.prompt_count() > 0);
}
