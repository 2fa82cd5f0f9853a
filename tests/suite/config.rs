//! Config file to running engine

use std::fs;

use serde_json::json;
use tempfile::TempDir;
use wiremock::MockServer;

use litera_client::HttpScoringService;
use litera_config::{LiteraConfig, Overrides, Settings};

use crate::common::{engine_with, mount_start, snapshot};

fn write_config(dir: &TempDir, body: &str) -> LiteraConfig {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    LiteraConfig::load_from(&path).unwrap().unwrap()
}

#[tokio::test]
async fn configured_backend_and_session_reach_the_service() {
    let server = MockServer::start().await;
    mount_start(&server, "sess_from_file", snapshot(64, 47, 3, json!({}))).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            "[backend]\nurl = \"{}/\"\nrequest_timeout_secs = 7\n\n[session]\nid = \"sess_from_file\"\n",
            server.uri()
        ),
    );
    let settings =
        Settings::resolve_with(Some(&config), &Overrides::default(), |_| None).unwrap();
    assert_eq!(settings.backend_url.as_str(), server.uri());
    assert_eq!(settings.request_timeout.as_secs(), 7);

    let service = HttpScoringService::new(settings.backend_url, settings.request_timeout).unwrap();
    let mut engine = engine_with(service, &settings.session_id.unwrap());
    let outcome = engine.start_session(None).await;

    assert!(outcome.is_applied());
    assert_eq!(engine.progress().public_trust.as_i64(), Some(64));
}

#[tokio::test]
async fn command_line_backend_beats_config_file() {
    let server = MockServer::start().await;
    mount_start(&server, "sess_cli", snapshot(50, 50, 0, json!({}))).await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "[backend]\nurl = \"http://127.0.0.1:9\"\n");
    let overrides = Overrides {
        backend_url: Some(server.uri()),
        request_timeout_secs: None,
        session_id: Some("sess_cli".to_string()),
    };
    let settings = Settings::resolve_with(Some(&config), &overrides, |_| None).unwrap();

    let service = HttpScoringService::new(settings.backend_url, settings.request_timeout).unwrap();
    let mut engine = engine_with(service, &settings.session_id.unwrap());

    assert!(engine.start_session(None).await.is_applied());
}
