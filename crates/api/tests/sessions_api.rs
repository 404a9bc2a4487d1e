//! Integration tests for the processing session endpoints.
//!
//! Each test runs against a fresh migrated database via `#[sqlx::test]`
//! and drives the full router, middleware included.

mod common;

use axum::http::{Method, StatusCode};
use common::{auth_token, body_json, build_test_app, get, send};
use sqlx::PgPool;

fn start_body() -> serde_json::Value {
    serde_json::json!({
        "process_type": "assessment_analysis",
        "pillar_type": "skills",
        "input_data": { "q1": "yes", "q2": "sometimes" },
    })
}

// ---------------------------------------------------------------------------
// Test: requests without a token are rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_token_returns_401(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(&app, "/api/v1/processing/sessions/latest").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Test: completed_at is set exactly when a session becomes terminal
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn completed_at_tracks_terminal_status(pool: PgPool) {
    let app = build_test_app(pool);
    let token = auth_token(1, "client");

    // A fresh session is non-terminal and has no completion time.
    let response = send(
        &app,
        Method::POST,
        "/api/v1/processing/sessions",
        &token,
        Some(start_body()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["status"], "started");
    assert!(created["data"]["completed_at"].is_null());
    let id = created["data"]["id"].as_i64().unwrap();

    // Completing it sets status and completion time together.
    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/complete"),
        &token,
        Some(serde_json::json!({ "results": { "summary": "done" } })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let completed = body_json(response).await;
    assert_eq!(completed["data"]["status"], "completed");
    assert_eq!(completed["data"]["progress_percentage"], 100);
    assert!(completed["data"]["completed_at"].is_string());
    // Results are merged into the metadata, not replacing it.
    assert_eq!(completed["data"]["processing_metadata"]["summary"], "done");
    assert_eq!(
        completed["data"]["processing_metadata"]["input_data"]["q1"],
        "yes"
    );
}

// ---------------------------------------------------------------------------
// Test: failing a session preserves its partial progress
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn failure_preserves_partial_progress(pool: PgPool) {
    let app = build_test_app(pool);
    let token = auth_token(1, "client");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/processing/sessions",
        &token,
        Some(start_body()),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/processing/sessions/{id}/progress"),
        &token,
        Some(serde_json::json!({ "progress": 40, "current_step": "invoking_model" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["data"]["status"], "processing");
    assert_eq!(updated["data"]["progress_percentage"], 40);

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/fail"),
        &token,
        Some(serde_json::json!({ "error_details": "model unavailable" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let failed = body_json(response).await;
    assert_eq!(failed["data"]["status"], "failed");
    assert_eq!(failed["data"]["error_details"], "model unavailable");
    assert!(failed["data"]["completed_at"].is_string());
    // Partial progress stays visible for diagnostics.
    assert_eq!(failed["data"]["progress_percentage"], 40);
}

// ---------------------------------------------------------------------------
// Test: terminal sessions reject every further mutation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn completed_session_rejects_mutation(pool: PgPool) {
    let app = build_test_app(pool);
    let token = auth_token(1, "client");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/processing/sessions",
        &token,
        Some(start_body()),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/complete"),
        &token,
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A completed session can never be flipped to failed.
    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/fail"),
        &token,
        Some(serde_json::json!({ "error_details": "late failure" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");

    // Progress reports are rejected too.
    let response = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/processing/sessions/{id}/progress"),
        &token,
        Some(serde_json::json!({ "progress": 10 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The session is untouched.
    let response = send(
        &app,
        Method::GET,
        "/api/v1/processing/sessions/latest",
        &token,
        None,
    )
    .await;
    let latest = body_json(response).await;
    assert_eq!(latest["data"]["status"], "completed");
    assert!(latest["data"]["error_details"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_session_rejects_completion(pool: PgPool) {
    let app = build_test_app(pool);
    let token = auth_token(1, "client");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/processing/sessions",
        &token,
        Some(start_body()),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/fail"),
        &token,
        Some(serde_json::json!({ "error_details": "boom" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/complete"),
        &token,
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Test: a foreign user's session cannot be touched
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn foreign_session_is_forbidden(pool: PgPool) {
    let app = build_test_app(pool);
    let owner = auth_token(1, "client");
    let intruder = auth_token(2, "client");

    let response = send(
        &app,
        Method::POST,
        "/api/v1/processing/sessions",
        &owner,
        Some(start_body()),
    )
    .await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = send(
        &app,
        Method::POST,
        &format!("/api/v1/processing/sessions/{id}/fail"),
        &intruder,
        Some(serde_json::json!({ "error_details": "not yours" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
