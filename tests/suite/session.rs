//! Session start against a mocked scoring service

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use litera_client::HttpScoringService;
use litera_engine::{CallKind, CallOutcome};
use litera_types::{ProgressState, StartFailure, StatusMessage};

use crate::common::{
    SESSION, closed_port_url, engine_for, engine_with, http_service, mount_start, snapshot,
};

#[tokio::test]
async fn start_with_known_identifier_mirrors_snapshot() {
    let server = MockServer::start().await;
    mount_start(&server, SESSION, snapshot(50, 50, 0, json!({}))).await;
    let mut engine = engine_for(&server, SESSION);

    let outcome = engine.start_session(None).await;

    assert_eq!(
        outcome,
        CallOutcome::Applied {
            kind: CallKind::StartSession
        }
    );
    let view = engine.view();
    assert_eq!(view.identifier, SESSION);
    assert_eq!(view.progress, &ProgressState::new(50, 50, 0));
    assert!(view.progress.relationships.is_empty());
    assert_eq!(view.status.map(StatusMessage::as_str), Some("Session ready"));
    assert!(!view.busy);
}

#[tokio::test]
async fn start_without_identifier_sends_generated_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(50, 50, 0, json!({}))))
        .expect(1)
        .mount(&server)
        .await;
    let mut engine = engine_for(&server, "");

    engine.start_session(None).await;

    let sent = server.received_requests().await.unwrap();
    let body: serde_json::Value = sent[0].body_json().unwrap();
    let held = engine.identifier();
    assert!(held.starts_with("sess_"));
    assert_eq!(body, json!({ "session_id": held }));
}

#[tokio::test]
async fn resumed_session_shows_server_state() {
    let server = MockServer::start().await;
    mount_start(
        &server,
        "sess_resume",
        snapshot(72, 38, 25, json!({"alex": 2, "coach": "trusted"})),
    )
    .await;
    let mut engine = engine_for(&server, "sess_other");

    engine.start_session(Some("sess_resume".to_string())).await;

    let progress = engine.progress();
    assert_eq!(engine.identifier(), "sess_resume");
    assert_eq!(progress.public_trust.as_i64(), Some(72));
    assert_eq!(progress.relationships["alex"], json!(2));
    assert_eq!(progress.relationships["coach"], json!("trusted"));
}

#[tokio::test]
async fn repeated_start_yields_same_state() {
    let server = MockServer::start().await;
    mount_start(&server, SESSION, snapshot(61, 44, 12, json!({"alex": 1}))).await;
    let mut engine = engine_for(&server, SESSION);

    engine.start_session(None).await;
    let first = engine.progress().clone();
    engine.start_session(None).await;

    assert_eq!(engine.progress(), &first);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_service_reports_backend_hint() {
    let service = HttpScoringService::new(closed_port_url(), Duration::from_secs(5)).unwrap();
    let mut engine = engine_with(service, SESSION);

    let outcome = engine.start_session(None).await;

    assert!(matches!(outcome, CallOutcome::TransportFailed { .. }));
    assert_eq!(
        engine.status(),
        Some(&StatusMessage::StartFailed(StartFailure::Unreachable))
    );
    assert_eq!(
        engine.status().unwrap().as_str(),
        "Failed to start. Check backend URL."
    );
    assert_eq!(engine.progress(), &ProgressState::default());
}

#[tokio::test]
async fn server_error_on_start_keeps_prior_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(66, 40, 10, json!({}))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/start"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let mut engine = engine_for(&server, SESSION);

    engine.start_session(None).await;
    let before = engine.progress().clone();
    engine.start_session(None).await;

    assert_eq!(engine.progress(), &before);
    assert_eq!(
        engine.status(),
        Some(&StatusMessage::StartFailed(StartFailure::UnexpectedResponse))
    );
}

#[tokio::test]
async fn slow_start_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/start"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(snapshot(50, 50, 0, json!({}))),
        )
        .mount(&server)
        .await;
    let mut engine = engine_with(http_service(&server, Duration::from_millis(200)), SESSION);

    let outcome = engine.start_session(None).await;

    assert!(matches!(outcome, CallOutcome::TransportFailed { .. }));
    assert_eq!(
        engine.status(),
        Some(&StatusMessage::StartFailed(StartFailure::Unreachable))
    );
}
