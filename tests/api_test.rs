//! HTTP tests for the REST API, driven through the router without a socket.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use leaguedesk_lib::engine::api::{create_router, ApiState};
use leaguedesk_lib::engine::config::SchedulingConfig;
use leaguedesk_lib::engine::database::Database;
use leaguedesk_lib::engine::scheduling::ConflictPolicy;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    app_with(SchedulingConfig::default())
}

fn app_with(scheduling: SchedulingConfig) -> Router {
    let db = Database::in_memory().unwrap();
    create_router(ApiState::new(db, &scheduling))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!({}));
    (status, json)
}

fn assignment(match_id: &str, field: &str, time: &str) -> Value {
    json!({ "matchId": match_id, "fieldId": field, "date": "2024-01-01", "startTime": time })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document() {
    let (status, body) = send(&app(), "GET", "/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/schedule/check"].is_object());
}

#[tokio::test]
async fn test_check_reports_double_booking() {
    let app = app();
    let body = json!({ "assignments": [
        assignment("m1", "fieldA", "10:00"),
        assignment("m2", "fieldA", "10:00"),
        assignment("m3", "fieldB", "10:00"),
    ]});

    let (status, response) = send(&app, "POST", "/api/schedule/check", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response["conflicts"],
        json!([{
            "matchIds": ["m1", "m2"],
            "reason": "Field fieldA is double-booked on 2024-01-01 at 10:00"
        }])
    );
}

#[tokio::test]
async fn test_incomplete_assignment_is_bad_request() {
    let body = json!({ "assignments": [
        assignment("m1", "fieldA", "10:00"),
        { "matchId": "m2", "fieldId": "fieldA", "date": "2024-01-01" },
    ]});

    let (status, response) = send(&app(), "POST", "/api/schedule/check", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("m2"));
}

#[tokio::test]
async fn test_apply_list_and_unassign() {
    let app = app();

    let body = json!({ "assignments": [assignment("m1", "fieldA", "10:00")] });
    let (status, response) = send(&app, "POST", "/api/schedule", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "applied", "applied": 1 }));

    let clash = json!({ "assignments": [assignment("m2", "fieldA", "10:00")] });
    let (status, response) = send(&app, "POST", "/api/schedule", Some(clash)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["status"], "rejected");
    assert_eq!(response["conflicts"][0]["matchIds"], json!(["m2", "m1"]));

    let (status, response) = send(&app, "GET", "/api/schedule?date=2024-01-01&fieldId=fieldA", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["count"], 1);
    assert_eq!(response["data"][0]["matchId"], "m1");
    assert_eq!(response["data"][0]["startTime"], "10:00:00");

    let (status, _) = send(&app, "GET", "/api/schedule?date=tomorrow", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", "/api/schedule/m1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", "/api/schedule/m1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_interval_policy_from_config() {
    let app = app_with(SchedulingConfig {
        default_duration_minutes: 60,
        conflict_policy: ConflictPolicy::Interval,
    });
    let body = json!({ "assignments": [
        assignment("m1", "fieldA", "10:00"),
        assignment("m2", "fieldA", "10:30"),
    ]});

    let (status, response) = send(&app, "POST", "/api/schedule/check", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["conflicts"][0]["matchIds"], json!(["m1", "m2"]));
}

#[tokio::test]
async fn test_reconcile_session_coaches() {
    let app = app();

    let (status, _) = send(
        &app,
        "PUT",
        "/api/sessions/session-1/members",
        Some(json!({ "memberIds": ["c1", "c2"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, response) = send(
        &app,
        "PUT",
        "/api/sessions/session-1/members",
        Some(json!({ "memberIds": ["c2", "c3"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["removed"], json!(["c1"]));
    assert_eq!(response["added"], json!(["c3"]));
    assert_eq!(response["ownerKind"], "session");

    let (_, response) = send(&app, "GET", "/api/sessions/session-1/members", None).await;
    assert_eq!(response["memberIds"], json!(["c2", "c3"]));

    // Same owner id on another kind is untouched
    let (_, response) = send(&app, "GET", "/api/programs/session-1/members", None).await;
    assert_eq!(response["memberIds"], json!([]));
}

#[tokio::test]
async fn test_team_roster_is_idempotent() {
    let app = app();
    let body = json!({ "memberIds": ["p1", "p2", "p2"] });

    let (_, first) = send(&app, "PUT", "/api/teams/hornets/members", Some(body.clone())).await;
    assert_eq!(first["addedCount"], 2);

    let (status, second) = send(&app, "PUT", "/api/teams/hornets/members", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["addedCount"], 0);
    assert_eq!(second["removedCount"], 0);
    assert_eq!(second["unchanged"], 2);
}

#[tokio::test]
async fn test_member_list_must_be_a_list() {
    let app = app();

    let (status, response) = send(
        &app,
        "PUT",
        "/api/teams/hornets/members",
        Some(json!({ "memberIds": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("list"));

    let (status, _) = send(&app, "PUT", "/api/teams/hornets/members", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/teams/%20/members",
        Some(json!({ "memberIds": ["p1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn send_raw(app: &Router, method: &str, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_malformed_body_returns_json_error() {
    let app = app();

    let (status, response) = send_raw(
        &app,
        "PUT",
        "/api/teams/t1/members",
        Some("application/json"),
        "{not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string(), "{}", response);

    let (status, response) = send_raw(
        &app,
        "POST",
        "/api/schedule/check",
        None,
        r#"{"assignments": []}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("Content-Type"));

    let (status, response) = send_raw(&app, "POST", "/api/schedule", Some("application/json"), "[1, 2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());
}

#[tokio::test]
async fn test_store_failure_is_server_error() {
    let db = Database::in_memory().unwrap();
    db.get_connection()
        .unwrap()
        .execute_batch("DROP TABLE memberships; DROP TABLE match_assignments;")
        .unwrap();
    let app = create_router(ApiState::new(db, &SchedulingConfig::default()));

    let (status, response) = send(
        &app,
        "PUT",
        "/api/teams/hornets/members",
        Some(json!({ "memberIds": ["p1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response["error"].as_str().unwrap().starts_with("Persistence error"));

    let (status, response) = send(&app, "GET", "/api/schedule", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response["error"].is_string());
}
