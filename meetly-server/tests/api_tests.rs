//! Integration tests for meetly-server API endpoints
//!
//! Each test builds the router over a fresh in-memory database and drives it
//! with `oneshot` requests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use meetly_common::db::init::init_memory_database;
use meetly_common::db::{meetings, participants, User};
use meetly_server::{build_router, ApiError, AppState, RoomTokenIssuer};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Deterministic room token so tests can assert on it
struct FakeRoomTokens;

impl RoomTokenIssuer for FakeRoomTokens {
    fn issue(&self, user: &User, room: &str, _now: DateTime<Utc>) -> Result<String, ApiError> {
        Ok(format!("room-token:{}:{}", room, user.username))
    }
}

/// Test helper: app over a fresh in-memory database
async fn setup_app() -> (Router, SqlitePool) {
    let db = init_memory_database().await.unwrap();
    let state = AppState::new(db.clone(), Arc::new(FakeRoomTokens));
    (build_router(state), db)
}

/// Test helper: send a request, returning status and JSON body (Null when empty)
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, json)
}

/// Test helper: register a user, returning (token, user id)
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Test helper: create a meeting, returning the response body
async fn create_meeting(app: &Router, token: &str, title: &str) -> Value {
    let (status, body) = send(app, "POST", "/meetings", Some(token), Some(json!({ "title": title }))).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _) = setup_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "meetly-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let (app, _) = setup_app().await;

    for (method, uri) in [
        ("GET", "/auth/me"),
        ("GET", "/meetings/ongoing"),
        ("GET", "/meetings/created"),
        ("GET", "/meetings/meetings"),
        ("GET", "/meetings/code/abc-defg-hij"),
    ] {
        let (status, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    let (status, _) = send(&app, "GET", "/auth/me", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_me_logout() {
    let (app, _) = setup_app().await;
    let (token, user_id) = register(&app, "ada").await;

    let (status, body) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["username"], "ada");
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_token = body["token"].as_str().unwrap().to_string();
    assert_ne!(second_token, token);

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Other sessions survive
    let (status, _) = send(&app, "GET", "/auth/me", Some(&second_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_errors() {
    let (app, _) = setup_app().await;
    register(&app, "ada").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "ada2", "email": "ada@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "", "email": "x@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Meetings
// =============================================================================

#[tokio::test]
async fn test_create_meeting_generates_code() {
    let (app, _) = setup_app().await;
    let (token, user_id) = register(&app, "host").await;

    let meeting = create_meeting(&app, &token, "Weekly sync").await;
    assert_eq!(meeting["title"], "Weekly sync");
    assert_eq!(meeting["userId"], user_id.as_str());
    assert_eq!(meeting["durationInSecs"], 0);
    assert!(meeting["startTime"].is_null());
    let code = meeting["code"].as_str().unwrap();
    assert!(meetly_common::ids::is_valid_meeting_code(code), "bad code {}", code);

    let (status, _) = send(&app, "POST", "/meetings", Some(&token), Some(json!({ "title": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_join_and_rejoin_do_not_duplicate() {
    let (app, _) = setup_app().await;
    let (host_token, host_id) = register(&app, "host").await;
    let (guest_token, _) = register(&app, "guest").await;
    let meeting = create_meeting(&app, &host_token, "Standup").await;
    let code = meeting["code"].as_str().unwrap();

    let (status, body) = send(&app, "PUT", "/meetings/join", Some(&guest_token), Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], format!("room-token:{}:guest", code));
    assert_eq!(body["participant"]["isActive"], true);
    assert_eq!(body["participant"]["durationInSecs"], 0);
    assert!(body["meeting"]["startTime"].is_null(), "guest join must not start the meeting");

    let (status, _) = send(&app, "PUT", "/meetings/join", Some(&guest_token), Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "PUT", "/meetings/join", Some(&host_token), Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["meeting"]["startTime"].is_string(), "host join starts the meeting");

    let (status, body) = send(&app, "GET", &format!("/meetings/code/{}", code), Some(&guest_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body["participants"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["user"]["username"], "guest");
    assert_eq!(list[1]["userId"], host_id.as_str());
}

#[tokio::test]
async fn test_leave_semantics() {
    let (app, _) = setup_app().await;
    let (host_token, _) = register(&app, "host").await;
    let (guest_token, _) = register(&app, "guest").await;
    let meeting = create_meeting(&app, &host_token, "Standup").await;
    let code = meeting["code"].as_str().unwrap();

    // Never joined
    let (status, body) = send(&app, "PUT", "/meetings/leave", Some(&guest_token), Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // Unknown meeting
    let (status, _) = send(&app, "PUT", "/meetings/leave", Some(&guest_token), Some(json!({ "code": "zzz-zzzz-zzz" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "PUT", "/meetings/join", Some(&guest_token), Some(json!({ "code": code }))).await;
    let (status, first) = send(&app, "PUT", "/meetings/leave", Some(&guest_token), Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["isActive"], false);

    // Leaving again is a no-op
    let (status, second) = send(&app, "PUT", "/meetings/leave", Some(&guest_token), Some(json!({ "code": code }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_join_unknown_code_is_not_found() {
    let (app, _) = setup_app().await;
    let (token, _) = register(&app, "guest").await;

    let (status, _) = send(&app, "PUT", "/meetings/join", Some(&token), Some(json!({ "code": "abc-defg-hij" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_meeting_listings() {
    let (app, _) = setup_app().await;
    let (host_token, _) = register(&app, "host").await;
    let (guest_token, _) = register(&app, "guest").await;
    let (outsider_token, _) = register(&app, "outsider").await;

    let live = create_meeting(&app, &host_token, "Live").await;
    let done = create_meeting(&app, &host_token, "Done").await;
    for meeting in [&live, &done] {
        send(&app, "PUT", "/meetings/join", Some(&guest_token), Some(json!({ "code": meeting["code"] }))).await;
    }
    send(&app, "PUT", "/meetings/leave", Some(&guest_token), Some(json!({ "code": done["code"] }))).await;

    let (_, created) = send(&app, "GET", "/meetings/created", Some(&host_token), None).await;
    assert_eq!(created.as_array().unwrap().len(), 2);

    let (_, joined) = send(&app, "GET", "/meetings/meetings", Some(&guest_token), None).await;
    assert_eq!(joined.as_array().unwrap().len(), 2);
    assert!(joined[0]["participants"].is_array());

    let (_, ongoing) = send(&app, "GET", "/meetings/ongoing", Some(&guest_token), None).await;
    let ongoing = ongoing.as_array().unwrap();
    assert_eq!(ongoing.len(), 1);
    assert_eq!(ongoing[0]["id"], live["id"]);

    let (_, ongoing) = send(&app, "GET", "/meetings/ongoing", Some(&host_token), None).await;
    assert_eq!(ongoing.as_array().unwrap().len(), 1);

    let (_, ongoing) = send(&app, "GET", "/meetings/ongoing", Some(&outsider_token), None).await;
    assert!(ongoing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_meeting_refresh_keeps_session_alive() {
    let (app, db) = setup_app().await;
    let (host_token, host_id) = register(&app, "host").await;
    let (guest_token, guest_id) = register(&app, "guest").await;
    let meeting = create_meeting(&app, &host_token, "Standup").await;
    let code = meeting["code"].as_str().unwrap();
    for token in [&host_token, &guest_token] {
        send(&app, "PUT", "/meetings/join", Some(token), Some(json!({ "code": code }))).await;
    }

    // Both clients last heard from ten minutes ago
    sqlx::query("UPDATE meeting_participants SET last_seen = ?")
        .bind((Utc::now() - Duration::seconds(600)).timestamp())
        .execute(&db)
        .await
        .unwrap();

    // Only the guest's client is still polling
    let (status, _) = send(&app, "GET", &format!("/meetings/code/{}", code), Some(&guest_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let outcome = participants::checkpoint_active(&db, Utc::now(), std::time::Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(outcome.credited, 1);
    assert_eq!(outcome.closed, 1);

    let meeting_id = meeting["id"].as_str().unwrap();
    let guest = participants::find_participant(&db, meeting_id, &guest_id).await.unwrap().unwrap();
    let host = participants::find_participant(&db, meeting_id, &host_id).await.unwrap().unwrap();
    assert!(guest.is_active);
    assert!(!host.is_active);

    // Once the guest stops polling too, the meeting is no longer ongoing
    sqlx::query("UPDATE meeting_participants SET last_seen = ?")
        .bind((Utc::now() - Duration::seconds(600)).timestamp())
        .execute(&db)
        .await
        .unwrap();
    participants::checkpoint_active(&db, Utc::now(), std::time::Duration::from_secs(60))
        .await
        .unwrap();
    let (_, ongoing) = send(&app, "GET", "/meetings/ongoing", Some(&host_token), None).await;
    assert!(ongoing.as_array().unwrap().is_empty());
}

// =============================================================================
// Attendance
// =============================================================================

#[tokio::test]
async fn test_attendance_report_is_host_only() {
    let (app, db) = setup_app().await;
    let (host_token, host_id) = register(&app, "host").await;
    let (guest_token, guest_id) = register(&app, "guest").await;
    let created = create_meeting(&app, &host_token, "Lecture").await;
    let id = created["id"].as_str().unwrap();

    // Drive the bookkeeping with explicit times: host 600s, guest 300s
    let meeting = meetings::find_meeting_by_id(&db, id).await.unwrap().unwrap();
    let t0 = Utc::now() - Duration::hours(1);
    participants::join(&db, &meeting, &host_id, t0).await.unwrap();
    participants::join(&db, &meeting, &guest_id, t0 + Duration::seconds(100)).await.unwrap();
    participants::leave(&db, &meeting, &guest_id, t0 + Duration::seconds(400)).await.unwrap();
    participants::leave(&db, &meeting, &host_id, t0 + Duration::seconds(600)).await.unwrap();

    let uri = format!("/meetings/{}/attendance", id);
    let (status, body) = send(&app, "GET", &uri, Some(&guest_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, report) = send(&app, "GET", &uri, Some(&host_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["hostDurationInSecs"], 600);
    assert_eq!(report["hostDurationDisplay"], "10m 0s");

    let entries = report["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    let guest = entries.iter().find(|e| e["username"] == "guest").unwrap();
    assert_eq!(guest["durationInSecs"], 300);
    assert_eq!(guest["percentage"], 50);
    assert_eq!(guest["lowAttendance"], false);
    assert_eq!(guest["isHost"], false);
    let host = entries.iter().find(|e| e["isHost"] == true).unwrap();
    assert_eq!(host["percentage"], 100);

    let (status, _) = send(&app, "GET", "/meetings/no-such-id/attendance", Some(&host_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attendance_without_host_join_is_zero() {
    let (app, db) = setup_app().await;
    let (host_token, _) = register(&app, "host").await;
    let (_, guest_id) = register(&app, "guest").await;
    let created = create_meeting(&app, &host_token, "Async").await;
    let id = created["id"].as_str().unwrap();

    let meeting = meetings::find_meeting_by_id(&db, id).await.unwrap().unwrap();
    let t0 = Utc::now() - Duration::hours(1);
    participants::join(&db, &meeting, &guest_id, t0).await.unwrap();
    participants::leave(&db, &meeting, &guest_id, t0 + Duration::seconds(120)).await.unwrap();

    let (status, report) = send(&app, "GET", &format!("/meetings/{}/attendance", id), Some(&host_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["hostDurationInSecs"], 0);
    assert_eq!(report["entries"][0]["percentage"], 0);
    assert_eq!(report["entries"][0]["lowAttendance"], true);
}

// =============================================================================
// Submissions
// =============================================================================

#[tokio::test]
async fn test_submissions_upsert_and_list() {
    let (app, _) = setup_app().await;
    let (host_token, _) = register(&app, "host").await;
    let (guest_token, _) = register(&app, "guest").await;
    let (outsider_token, _) = register(&app, "outsider").await;
    let meeting = create_meeting(&app, &host_token, "Workshop").await;
    let meeting_id = meeting["id"].as_str().unwrap();
    send(&app, "PUT", "/meetings/join", Some(&guest_token), Some(json!({ "code": meeting["code"] }))).await;

    let submit = |name: &str, size: i64| {
        json!({
            "meetingId": meeting_id,
            "fileUrl": format!("https://files.example.com/{}", name),
            "fileName": name,
            "fileType": "application/pdf",
            "fileSize": size,
        })
    };

    let (status, first) = send(&app, "PUT", "/submissions", Some(&guest_token), Some(submit("draft.pdf", 100))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&app, "PUT", "/submissions", Some(&guest_token), Some(submit("final.pdf", 200))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["fileName"], "final.pdf");

    let uri = format!("/submissions/meeting/{}", meeting_id);
    let (status, list) = send(&app, "GET", &uri, Some(&host_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["fileSize"], 200);
    assert_eq!(list[0]["user"]["username"], "guest");
    assert_eq!(list[0]["user"]["email"], "guest@example.com");

    let (status, _) = send(&app, "PUT", "/submissions", Some(&outsider_token), Some(submit("x.pdf", 1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "GET", &uri, Some(&outsider_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/submissions/meeting/unknown", Some(&host_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
