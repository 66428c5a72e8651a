//! Handler tests against the in-memory backends.

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::Utc;
use postern_core::{
  engine::{AccessEngine, EnginePolicy},
  memory::{
    MemoryCredentialStore, MemoryDirectory, MemoryDispatcher,
    MemoryRateLimiter,
  },
  otp,
  redeem::{RedemptionPolicy, RedemptionService},
  register::RegistrationService,
  subject::DirectoryEntry,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

struct Fixture {
  router:      Router,
  credentials: MemoryCredentialStore,
  directory:   MemoryDirectory,
  dispatcher:  MemoryDispatcher,
}

fn fixture() -> Fixture {
  let credentials = MemoryCredentialStore::new();
  let directory = MemoryDirectory::new();
  let dispatcher = MemoryDispatcher::new();

  let state = AppState::new(
    AccessEngine::new(
      MemoryRateLimiter::new(),
      credentials.clone(),
      directory.clone(),
      dispatcher.clone(),
      EnginePolicy::default(),
    ),
    RedemptionService::new(
      credentials.clone(),
      directory.clone(),
      RedemptionPolicy::default(),
    ),
    RegistrationService::new(
      credentials.clone(),
      directory.clone(),
      dispatcher.clone(),
    ),
  );

  Fixture { router: api_router(state), credentials, directory, dispatcher }
}

async fn post(router: Router, path: &str, body: Value) -> (StatusCode, Value) {
  let response = router
    .oneshot(
      Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
    )
    .await
    .unwrap();

  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

// ─── /verify ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn verify_without_a_code_is_a_bad_request() {
  let f = fixture();

  let (status, body) = post(f.router, "/verify", json!({})).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("code"));
}

#[tokio::test]
async fn verify_round_trip_reports_the_display_name() {
  let f = fixture();
  f.directory.insert(DirectoryEntry {
    subject_id:   "face-a".into(),
    display_name: "Alice".into(),
    contact_hint: None,
    created_at:   Utc::now(),
  });
  let passcode =
    otp::issue(&f.credentials, "face-a".into(), Utc::now()).await.unwrap();

  let (status, body) =
    post(f.router, "/verify", json!({ "code": passcode.code })).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "valid": true, "displayName": "Alice" }));
}

#[tokio::test]
async fn verify_unknown_code_is_ok_but_invalid() {
  let f = fixture();

  let (status, body) = post(f.router, "/verify", json!({ "code": "000000" })).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "valid": false }));
}

// ─── /register ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_without_a_name_is_a_bad_request() {
  let f = fixture();

  let (status, body) = post(f.router, "/register", json!({ "note": "hi" })).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("displayName"));
}

#[tokio::test]
async fn register_then_verify_resolves_the_approved_name() {
  let f = fixture();

  let (status, body) = post(
    f.router.clone(),
    "/register",
    json!({ "displayName": "Carol", "note": "delivery" }),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "accepted": true }));
  assert_eq!(f.dispatcher.sent().len(), 1);

  let stored = f.credentials.stored();
  assert_eq!(stored.len(), 1);

  let (status, body) =
    post(f.router, "/verify", json!({ "code": stored[0].code })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "valid": true, "displayName": "Carol" }));
}

// ─── /events ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_batch_reports_counts() {
  let f = fixture();
  f.directory.insert(DirectoryEntry {
    subject_id:   "face-a".into(),
    display_name: "Alice".into(),
    contact_hint: None,
    created_at:   Utc::now(),
  });

  let (status, body) = post(
    f.router,
    "/events",
    json!([
      { "subjectId": "face-a", "confidence": 99.2 },
      {},
      { "subjectId": "face-a", "confidence": 98.7 },
    ]),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!({ "processed": 3, "notified": 2, "suppressed": 1, "failed": 0 })
  );
  assert_eq!(f.dispatcher.sent().len(), 2);
}
