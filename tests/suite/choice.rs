//! Choice submission against a mocked scoring service

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use litera_client::HttpScoringService;
use litera_engine::{CallOutcome, Refusal};
use litera_types::StatusMessage;
use litera_types::scenario::{ETHICAL_DILEMMA, PREBUNK_POST, PROFESSIONAL_MEETING, PostLabel};

use crate::common::{
    SESSION, closed_port_url, engine_for, engine_with, http_service, mount_choice,
    mount_choice_error, mount_start, snapshot,
};

#[tokio::test]
async fn hoax_label_updates_trust() {
    let server = MockServer::start().await;
    mount_start(&server, SESSION, snapshot(50, 50, 0, json!({}))).await;
    mount_choice(
        &server,
        json!({
            "session_id": SESSION,
            "module": "prebunking",
            "action_type": "label_post",
            "payload": {"post_id": "p1", "label": "hoax", "truth": "hoax"}
        }),
        json!({
            "public_trust": 55,
            "personal_clout": 52,
            "professional_skill": 0,
            "relationships": {},
            "outcome": {"message": "Correct!"}
        }),
    )
    .await;
    let mut engine = engine_for(&server, SESSION);
    engine.start_session(None).await;

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert!(outcome.is_applied());
    let progress = engine.progress();
    assert_eq!(progress.public_trust.as_i64(), Some(55));
    assert_eq!(progress.personal_clout.as_i64(), Some(52));
    assert_eq!(progress.professional_skill.as_i64(), Some(0));
    assert_eq!(engine.status().unwrap().as_str(), "Correct!");
}

#[tokio::test]
async fn choice_without_outcome_reports_updated() {
    let server = MockServer::start().await;
    mount_choice(
        &server,
        json!({"module": "ethical", "payload": {"choice": "intervene"}}),
        snapshot(53, 50, 0, json!({"alex": 1})),
    )
    .await;
    let mut engine = engine_for(&server, SESSION);

    engine
        .submit_action(ETHICAL_DILEMMA.decision_action("intervene").unwrap())
        .await;

    assert_eq!(engine.status(), Some(&StatusMessage::Updated));
    assert_eq!(engine.progress().relationships["alex"], json!(1));
}

#[tokio::test]
async fn float_meters_are_applied() {
    let server = MockServer::start().await;
    mount_choice(
        &server,
        json!({"module": "prebunking"}),
        json!({
            "public_trust": 55.0,
            "personal_clout": 52.5,
            "professional_skill": 0,
            "relationships": {}
        }),
    )
    .await;
    let mut engine = engine_for(&server, SESSION);

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert!(outcome.is_applied(), "{outcome:?}");
    let progress = engine.progress();
    assert_eq!(progress.public_trust.to_string(), "55");
    assert_eq!(progress.personal_clout.to_string(), "52.5");
    assert_eq!(engine.status(), Some(&StatusMessage::Updated));
}

#[tokio::test]
async fn professional_attempt_sends_task_payload() {
    let server = MockServer::start().await;
    mount_choice(
        &server,
        json!({
            "module": "professional",
            "action_type": "task_attempt",
            "payload": {"task": "meeting", "success": true}
        }),
        snapshot(50, 50, 8, json!({})),
    )
    .await;
    let mut engine = engine_for(&server, SESSION);

    let outcome = engine
        .submit_action(PROFESSIONAL_MEETING.attempt_action(0).unwrap())
        .await;

    assert!(outcome.is_applied());
    assert_eq!(engine.progress().professional_skill.as_i64(), Some(8));
}

#[tokio::test]
async fn rejection_keeps_progress_and_shows_detail() {
    let server = MockServer::start().await;
    mount_start(&server, SESSION, snapshot(58, 41, 9, json!({"alex": 3}))).await;
    mount_choice_error(&server, 400, json!({"detail": "invalid module"})).await;
    let mut engine = engine_for(&server, SESSION);
    engine.start_session(None).await;
    let before = engine.progress().clone();

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Verified))
        .await;

    assert_eq!(outcome, CallOutcome::Rejected { status: 400 });
    assert_eq!(engine.progress(), &before);
    assert_eq!(engine.status().unwrap().as_str(), "invalid module");
}

#[tokio::test]
async fn validation_error_list_is_shown_as_json() {
    let server = MockServer::start().await;
    mount_choice_error(
        &server,
        422,
        json!({"detail": [{"loc": ["body", "module"], "msg": "field required"}]}),
    )
    .await;
    let mut engine = engine_for(&server, SESSION);

    engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Misleading))
        .await;

    let status = engine.status().unwrap().as_str().to_string();
    assert!(status.contains("field required"), "{status}");
    assert!(status.starts_with('['), "{status}");
}

#[tokio::test]
async fn rejection_without_detail_shows_error() {
    let server = MockServer::start().await;
    mount_choice_error(&server, 500, json!({"error": "internal"})).await;
    let mut engine = engine_for(&server, SESSION);

    engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert_eq!(engine.status(), Some(&StatusMessage::Error));
}

#[tokio::test]
async fn html_error_page_is_a_network_error() {
    let server = MockServer::start().await;
    mount_start(&server, SESSION, snapshot(58, 41, 9, json!({"alex": 3}))).await;
    Mock::given(method("POST"))
        .and(path("/api/choice"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_raw("<html><body>Bad Gateway</body></html>", "text/html"),
        )
        .mount(&server)
        .await;
    let mut engine = engine_for(&server, SESSION);
    engine.start_session(None).await;
    let before = engine.progress().clone();

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert!(matches!(outcome, CallOutcome::TransportFailed { .. }), "{outcome:?}");
    assert_eq!(engine.status(), Some(&StatusMessage::NetworkError));
    assert_eq!(engine.progress(), &before);
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn submit_without_session_sends_nothing() {
    let server = MockServer::start().await;
    let mut engine = engine_for(&server, "");

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert_eq!(outcome, CallOutcome::Refused(Refusal::NoSession));
    assert_eq!(
        engine.status().unwrap().as_str(),
        "Start a session first"
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn slow_choice_times_out_and_keeps_progress() {
    let server = MockServer::start().await;
    mount_start(&server, SESSION, snapshot(58, 41, 9, json!({"alex": 3}))).await;
    Mock::given(method("POST"))
        .and(path("/api/choice"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(snapshot(99, 99, 99, json!({}))),
        )
        .mount(&server)
        .await;
    let mut engine = engine_with(http_service(&server, Duration::from_millis(300)), SESSION);
    engine.start_session(None).await;
    let before = engine.progress().clone();

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert!(matches!(outcome, CallOutcome::TransportFailed { .. }));
    assert_eq!(engine.progress(), &before);
    assert_eq!(
        engine.status().unwrap().as_str(),
        "Network error (request timed out)"
    );
}

#[tokio::test]
async fn unreachable_service_reports_network_error() {
    let service = HttpScoringService::new(closed_port_url(), Duration::from_secs(5)).unwrap();
    let mut engine = engine_with(service, SESSION);

    let outcome = engine
        .submit_action(PREBUNK_POST.label_action(PostLabel::Hoax))
        .await;

    assert!(matches!(outcome, CallOutcome::TransportFailed { .. }));
    assert_eq!(engine.status(), Some(&StatusMessage::NetworkError));
    assert!(!engine.is_busy());
}
