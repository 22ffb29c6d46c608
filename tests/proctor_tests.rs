// tests/proctor_tests.rs

mod common;

use serde_json::{Value, json};

use common::{TestApp, candidate_token, recruiter_token, spawn_app};

async fn post(app: &TestApp, path: &str, token: &str, body: Value) -> reqwest::Response {
    app.client
        .post(app.url(path))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

const UNKNOWN_SESSION: &str = "00000000-0000-4000-8000-000000000000";

async fn start_session(app: &TestApp, token: &str) -> String {
    let body: Value = post(app, "/api/proctor/session/start", token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    body["session_id"].as_str().unwrap().to_string()
}

async fn log(app: &TestApp, token: &str, session_id: &str, tag: &str) -> Value {
    post(
        app,
        "/api/proctor/violations",
        token,
        json!({ "type": tag, "session_id": session_id }),
    )
    .await
    .json()
    .await
    .unwrap()
}

#[tokio::test]
async fn violation_before_start_is_not_recorded() {
    let app = spawn_app([1]).await;
    let token = candidate_token(1);

    let response = post(
        &app,
        "/api/proctor/violations",
        &token,
        json!({ "type": "no_face", "session_id": UNKNOWN_SESSION }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 202);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["recorded"], false);
}

#[tokio::test]
async fn session_counts_violations_by_type() {
    let app = spawn_app([1]).await;
    let token = candidate_token(1);

    let session_id = start_session(&app, &token).await;

    for tag in ["tab_switch", "tab_switch", "screen_share"] {
        let body: Value = post(
            &app,
            "/api/proctor/violations",
            &token,
            json!({ "type": tag, "session_id": session_id, "details": { "source": "browser" } }),
        )
        .await
        .json()
        .await
        .unwrap();
        assert_eq!(body["recorded"], true);
    }

    // A detector still bound to an old session is ignored
    let body: Value = post(
        &app,
        "/api/proctor/violations",
        &token,
        json!({ "type": "no_face", "session_id": UNKNOWN_SESSION }),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(body["recorded"], false);

    let body: Value = post(&app, "/api/proctor/session/end", &token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    let summary = &body["summary"];
    assert_eq!(summary["session_id"], session_id.as_str());
    assert_eq!(summary["event_count"], 3);
    assert_eq!(summary["counts_by_type"]["tab_switch"], 2);
    assert_eq!(summary["counts_by_type"]["screen_share"], 1);
    assert_eq!(summary["counts_by_type"]["no_face"], 0);
    assert_eq!(body["risk_score"], 30);

    let report: Value = app
        .client
        .get(app.url(&format!("/api/recruiter/proctor/sessions/{}", session_id)))
        .bearer_auth(recruiter_token(100))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["status"], "completed");
    assert_eq!(report["event_count"], 3);
    assert_eq!(report["risk_score"], 30);
    assert_eq!(report["violation_counts"]["tab_switch"], 2);
}

#[tokio::test]
async fn end_without_start_returns_empty_summary() {
    let app = spawn_app([1]).await;

    let response = post(&app, "/api/proctor/session/end", &candidate_token(1), json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["summary"]["session_id"], Value::Null);
    assert_eq!(body["summary"]["event_count"], 0);
    assert_eq!(body["summary"]["counts_by_type"], json!({}));
    assert!(body.get("risk_score").is_none());
    assert!(body.get("fairplay_score").is_none());
}

#[tokio::test]
async fn summary_survives_store_outage_on_end() {
    let app = spawn_app([1]).await;
    let token = candidate_token(1);

    let session_id = start_session(&app, &token).await;
    log(&app, &token, &session_id, "multiple_faces").await;
    log(&app, &token, &session_id, "phone_detected").await;

    app.store.set_unavailable(true);
    let response = post(&app, "/api/proctor/session/end", &token, json!({})).await;
    assert_eq!(response.status().as_u16(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["summary"]["session_id"], session_id.as_str());
    assert_eq!(body["summary"]["event_count"], 2);
    assert_eq!(body["summary"]["counts_by_type"]["multiple_faces"], 1);
    assert_eq!(body["summary"]["counts_by_type"]["phone_detected"], 1);
    app.store.set_unavailable(false);

    // The session is idle either way
    let body = log(&app, &token, &session_id, "no_face").await;
    assert_eq!(body["recorded"], false);

    // Retrying delivers the same summary
    let response = post(&app, "/api/proctor/session/end", &token, json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["summary"]["session_id"], session_id.as_str());
    assert_eq!(body["summary"]["event_count"], 2);
    assert_eq!(body["risk_score"], 45);

    let report: Value = app
        .client
        .get(app.url(&format!("/api/recruiter/proctor/sessions/{}", session_id)))
        .bearer_auth(recruiter_token(100))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["status"], "completed");
    assert_eq!(report["event_count"], 2);
    assert_eq!(report["risk_score"], 45);

    // Nothing left to deliver
    let body: Value = post(&app, "/api/proctor/session/end", &token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["summary"]["session_id"], Value::Null);
}

#[tokio::test]
async fn violation_needs_the_live_session_id() {
    let app = spawn_app([1]).await;
    let token = candidate_token(1);

    let first = start_session(&app, &token).await;
    let second = start_session(&app, &token).await;
    assert_ne!(first, second);

    // A detector still bound to the replaced session
    let body = log(&app, &token, &first, "tab_switch").await;
    assert_eq!(body["recorded"], false);

    // No id at all is not attributable
    let response = post(
        &app,
        "/api/proctor/violations",
        &token,
        json!({ "type": "tab_switch" }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 422);

    let body = log(&app, &token, &second, "tab_switch").await;
    assert_eq!(body["recorded"], true);

    let body: Value = post(&app, "/api/proctor/session/end", &token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["summary"]["session_id"], second.as_str());
    assert_eq!(body["summary"]["event_count"], 1);

    // The replaced session was closed with its own (empty) log
    let report: Value = app
        .client
        .get(app.url(&format!("/api/recruiter/proctor/sessions/{}", first)))
        .bearer_auth(recruiter_token(100))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["status"], "completed");
    assert_eq!(report["event_count"], 0);
}

#[tokio::test]
async fn detector_signals_drive_status() {
    let app = spawn_app([1]).await;
    let token = candidate_token(1);

    let body: Value = post(&app, "/api/proctor/signal", &token, json!({ "signal": "alert" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "idle");

    let session_id = start_session(&app, &token).await;

    let body: Value = post(&app, "/api/proctor/signal", &token, json!({ "signal": "alert" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "warning");

    // Warning never blocks recording
    let body = log(&app, &token, &session_id, "looking_away").await;
    assert_eq!(body["recorded"], true);
    assert_eq!(body["severity"], "medium");

    let body: Value = post(&app, "/api/proctor/signal", &token, json!({ "signal": "clear" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn malformed_violation_tag_is_rejected() {
    let app = spawn_app([1]).await;

    let response = post(
        &app,
        "/api/proctor/violations",
        &candidate_token(1),
        json!({ "type": "Phone Detected!", "session_id": UNKNOWN_SESSION }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = spawn_app([]).await;

    let response = app
        .client
        .get(app.url(&format!("/api/recruiter/proctor/sessions/{}", UNKNOWN_SESSION)))
        .bearer_auth(recruiter_token(100))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn fairplay_is_derived_from_latest_session() {
    let app = spawn_app([5]).await;
    let token = candidate_token(5);

    let session_id = start_session(&app, &token).await;
    log(&app, &token, &session_id, "tab_switch").await;
    log(&app, &token, &session_id, "phone_detected").await;
    post(&app, "/api/proctor/session/end", &token, json!({})).await;

    let body: Value = post(
        &app,
        "/api/recruiter/candidates/5/verdict",
        &recruiter_token(100),
        json!({ "technical": 50.0, "psychometric": 50.0, "soft_skill": 50.0 }),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(body["subscores"]["fairplay"], 65.0);
    assert_eq!(body["overall"], 53.0);
    assert_eq!(body["verdict"], "no_hire");
}
