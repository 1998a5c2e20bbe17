//! HTTP-level tests for the achievement and verification endpoints.
//!
//! Requests go straight to the router through `tower::ServiceExt::oneshot`,
//! backed by the in-memory stores.

mod common;

use achievo_core::achievement::AchievementStatus;
use achievo_core::notification::NotificationType;
use achievo_core::roles::Role;
use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// Authentication and health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok_without_databases() {
    let app = build_test_app();
    let response = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = build_test_app();
    let response = app.send(Method::GET, "/api/v1/achievements", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = build_test_app();
    let response = app.get("/api/v1/achievements", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = build_test_app();
    let response = app.send(Method::GET, "/health", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn student_creates_scored_draft() {
    let app = build_test_app();
    let response = app
        .post(
            "/api/v1/achievements",
            &app.student(),
            json!({
                "type": "competition",
                "title": "National Robotics Cup",
                "details": { "level": "national", "rank": 1 },
                "tags": ["robotics"],
                "achieved_date": "2026-05-02"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let record = &json["data"];
    assert_eq!(record["reference"]["status"], "draft");
    assert_eq!(record["reference"]["student_id"], STUDENT);
    assert_eq!(record["document"]["points"], 300);
    assert_eq!(record["document"]["owner_student_id"], STUDENT);
    assert_eq!(
        record["reference"]["document_id"],
        record["document"]["document_id"]
    );
    assert_eq!(app.documents.all().len(), 1);
    assert_eq!(app.references.all().len(), 1);
}

#[tokio::test]
async fn unknown_type_is_rejected_before_any_write() {
    let app = build_test_app();
    let response = app
        .post(
            "/api/v1/achievements",
            &app.student(),
            json!({ "type": "sports", "title": "Marathon" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_TYPE");
    assert_eq!(app.documents.writes(), 0);
    assert_eq!(app.references.writes(), 0);
}

#[tokio::test]
async fn advisor_role_cannot_create() {
    let app = build_test_app();
    let response = app
        .post(
            "/api/v1/achievements",
            &app.advisor(),
            json!({ "type": "other", "title": "x", "student_id": STUDENT }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.documents.writes(), 0);
}

#[tokio::test]
async fn student_cannot_create_for_another_student() {
    let app = build_test_app();
    let response = app
        .post(
            "/api/v1/achievements",
            &app.student(),
            json!({ "type": "other", "title": "x", "student_id": OTHER_STUDENT }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.documents.writes(), 0);
}

#[tokio::test]
async fn admin_must_name_the_student() {
    let app = build_test_app();
    let missing = app
        .post(
            "/api/v1/achievements",
            &app.admin(),
            json!({ "type": "academic", "title": "Dean's list" }),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let named = app
        .post(
            "/api/v1/achievements",
            &app.admin(),
            json!({ "type": "academic", "title": "Dean's list", "student_id": OTHER_STUDENT }),
        )
        .await;
    assert_eq!(named.status(), StatusCode::CREATED);
    assert_eq!(body_json(named).await["data"]["reference"]["student_id"], OTHER_STUDENT);
}

#[tokio::test]
async fn failed_reference_write_is_compensated() {
    let app = build_test_app();
    app.references.fail_next("insert");
    let response = app
        .post(
            "/api/v1/achievements",
            &app.student(),
            json!({ "type": "publication", "title": "On Graphs" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "REFERENCE_CREATE_FAILED");
    assert!(app.documents.all().is_empty());
    assert!(app.references.all().is_empty());
}

#[tokio::test]
async fn unavailable_document_store_is_503() {
    let app = build_test_app();
    app.documents.set_unavailable(true);
    let response = app
        .post(
            "/api/v1/achievements",
            &app.student(),
            json!({ "type": "other", "title": "x" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "STORE_UNAVAILABLE");
    assert!(!json["error"].as_str().unwrap().contains("injected"));
    assert!(app.references.all().is_empty());
}

// ---------------------------------------------------------------------------
// Read, update, delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn readers_are_owner_advisor_and_admin() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let uri = format!("/api/v1/achievements/{id}");

    for token in [app.student(), app.advisor(), app.admin()] {
        assert_eq!(app.get(&uri, &token).await.status(), StatusCode::OK);
    }
    let stranger = app.token(OTHER_STUDENT_USER, Role::Student);
    assert_eq!(app.get(&uri, &stranger).await.status(), StatusCode::FORBIDDEN);
    let other_advisor = app.token(OTHER_ADVISOR_USER, Role::Advisor);
    assert_eq!(
        app.get(&uri, &other_advisor).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn update_rescores_a_draft() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let response = app
        .put(
            &format!("/api/v1/achievements/{id}"),
            &app.student(),
            json!({ "details": { "level": "international", "rank": 1 } }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["document"]["points"], 400);
}

#[tokio::test]
async fn update_after_submit_conflicts() {
    let app = build_test_app();
    let id = app.create_competition().await;
    app.post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;

    let response = app
        .put(
            &format!("/api/v1/achievements/{id}"),
            &app.student(),
            json!({ "title": "Renamed" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_STATE");
}

#[tokio::test]
async fn changing_the_type_is_rejected() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let response = app
        .put(
            &format!("/api/v1/achievements/{id}"),
            &app.student(),
            json!({ "type": "publication" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn deleted_draft_disappears() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let uri = format!("/api/v1/achievements/{id}");

    let response = app.delete(&uri, &app.student()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(app.get(&uri, &app.student()).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.references.all()[0].status, AchievementStatus::Deleted);
    assert!(app.documents.all()[0].is_deleted);

    let list = body_json(app.get("/api/v1/achievements", &app.student()).await).await;
    assert_eq!(list["data"]["total"], 0);
}

#[tokio::test]
async fn attachments_are_appended_to_drafts() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let response = app
        .post(
            &format!("/api/v1/achievements/{id}/attachments"),
            &app.student(),
            json!({
                "filename": "certificate.pdf",
                "url": "/uploads/certificate.pdf",
                "content_type": "application/pdf"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let attachments = json["data"]["document"]["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["filename"], "certificate.pdf");
}

// ---------------------------------------------------------------------------
// Verification workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_verify_round_trip_notifies_both_sides() {
    let app = build_test_app();
    let id = app.create_competition().await;

    let submitted = app
        .post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;
    assert_eq!(submitted.status(), StatusCode::OK);
    let submitted = body_json(submitted).await;
    assert_eq!(submitted["data"]["status"], "submitted");
    assert!(submitted["data"]["submitted_at"].is_string());

    let advisor_inbox = app.inbox_of(ADVISOR_USER, 1).await;
    assert_eq!(advisor_inbox[0].kind, NotificationType::AchievementSubmitted);

    let verified = app
        .post(&format!("/api/v1/achievements/{id}/verify"), &app.advisor(), json!({}))
        .await;
    assert_eq!(verified.status(), StatusCode::OK);
    let verified = body_json(verified).await;
    assert_eq!(verified["data"]["status"], "verified");
    assert_eq!(verified["data"]["verified_by"], ADVISOR_USER);

    let student_inbox = app.inbox_of(STUDENT_USER, 1).await;
    assert_eq!(student_inbox[0].kind, NotificationType::AchievementVerified);
    assert!(student_inbox[0].message.contains("National Robotics Cup"));
}

#[tokio::test]
async fn second_verify_conflicts() {
    let app = build_test_app();
    let id = app.create_competition().await;
    app.post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;
    let uri = format!("/api/v1/achievements/{id}/verify");
    assert_eq!(app.post(&uri, &app.advisor(), json!({})).await.status(), StatusCode::OK);

    let again = app.post(&uri, &app.admin(), json!({})).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(again).await["code"], "INVALID_STATE");
    assert_eq!(app.references.all()[0].verified_by, Some(ADVISOR_USER));
}

#[tokio::test]
async fn unrelated_advisor_cannot_verify() {
    let app = build_test_app();
    let id = app.create_competition().await;
    app.post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;
    let writes = app.references.writes();

    let other_advisor = app.token(OTHER_ADVISOR_USER, Role::Advisor);
    let response = app
        .post(&format!("/api/v1/achievements/{id}/verify"), &other_advisor, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.references.writes(), writes);
    assert_eq!(app.references.all()[0].status, AchievementStatus::Submitted);
}

#[tokio::test]
async fn student_role_cannot_verify() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let response = app
        .post(&format!("/api/v1/achievements/{id}/verify"), &app.student(), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reject_requires_a_note() {
    let app = build_test_app();
    let id = app.create_competition().await;
    app.post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;
    let uri = format!("/api/v1/achievements/{id}/reject");

    let blank = app.post(&uri, &app.advisor(), json!({ "note": "   " })).await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(blank).await["code"], "INVALID_ARGUMENT");
    assert_eq!(app.references.all()[0].status, AchievementStatus::Submitted);

    let rejected = app
        .post(&uri, &app.advisor(), json!({ "note": "Certificate is unreadable" }))
        .await;
    assert_eq!(rejected.status(), StatusCode::OK);
    let json = body_json(rejected).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert_eq!(json["data"]["rejection_note"], "Certificate is unreadable");

    let inbox = app.inbox_of(STUDENT_USER, 1).await;
    assert_eq!(inbox[0].kind, NotificationType::AchievementRejected);
    assert!(inbox[0].message.contains("Certificate is unreadable"));
}

#[tokio::test]
async fn verifying_a_draft_conflicts() {
    let app = build_test_app();
    let id = app.create_competition().await;
    let response = app
        .post(&format!("/api/v1/achievements/{id}/verify"), &app.advisor(), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn history_records_every_transition() {
    let app = build_test_app();
    let id = app.create_competition().await;
    app.post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;
    app.post(
        &format!("/api/v1/achievements/{id}/reject"),
        &app.advisor(),
        json!({ "note": "Missing proof" }),
    )
    .await;

    let response = app
        .get(&format!("/api/v1/achievements/{id}/history"), &app.student())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let statuses: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["new_status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, ["draft", "submitted", "rejected"]);
    assert_eq!(json["data"][2]["note"], "Missing proof");
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let app = build_test_app();
    app.create_competition().await;
    app.post(
        "/api/v1/achievements",
        &app.token(OTHER_STUDENT_USER, Role::Student),
        json!({ "type": "other", "title": "Volunteering" }),
    )
    .await;

    let total = |json: serde_json::Value| json["data"]["total"].as_i64().unwrap();
    let own = body_json(app.get("/api/v1/achievements", &app.student()).await).await;
    assert_eq!(total(own.clone()), 1);
    assert_eq!(own["data"]["items"][0]["title"], "National Robotics Cup");

    let advisor = body_json(app.get("/api/v1/achievements", &app.advisor()).await).await;
    assert_eq!(total(advisor), 1);

    let admin = body_json(app.get("/api/v1/achievements", &app.admin()).await).await;
    assert_eq!(total(admin), 2);
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let app = build_test_app();
    for _ in 0..3 {
        app.create_competition().await;
    }

    let page = body_json(
        app.get("/api/v1/achievements?limit=2&offset=0", &app.student())
            .await,
    )
    .await;
    assert_eq!(page["data"]["total"], 3);
    assert_eq!(page["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["data"]["limit"], 2);

    let submitted = body_json(
        app.get("/api/v1/achievements?status=submitted", &app.student())
            .await,
    )
    .await;
    assert_eq!(submitted["data"]["total"], 0);

    let bad = app
        .get("/api/v1/achievements?status=approved", &app.student())
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn advisee_queue_holds_only_submitted_work_of_own_advisees() {
    let app = build_test_app();
    let submitted = app.create_competition().await;
    app.create_competition().await;
    app.post(
        &format!("/api/v1/achievements/{submitted}/submit"),
        &app.student(),
        json!({}),
    )
    .await;

    let queue = body_json(app.get("/api/v1/advisees/achievements", &app.advisor()).await).await;
    assert_eq!(queue["data"]["total"], 1);
    assert_eq!(queue["data"]["items"][0]["reference_id"], submitted);

    let other = app.token(OTHER_ADVISOR_USER, Role::Advisor);
    let empty = body_json(app.get("/api/v1/advisees/achievements", &other).await).await;
    assert_eq!(empty["data"]["total"], 0);

    let student = app
        .get("/api/v1/advisees/achievements", &app.student())
        .await;
    assert_eq!(student.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Malformed bodies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_body_gets_error_envelope() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/achievements")
        .header("authorization", format!("Bearer {}", app.student()))
        .header("content-type", "application/json")
        .body(Body::from("{\"type\": \"competition\", \"title\":"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].is_string());
    assert!(app.documents.all().is_empty());
}

#[tokio::test]
async fn mistyped_reject_body_is_bad_request() {
    let app = build_test_app();
    let id = app.create_competition().await;
    app.post(&format!("/api/v1/achievements/{id}/submit"), &app.student(), json!({}))
        .await;

    let response = app
        .post(
            &format!("/api/v1/achievements/{id}/reject"),
            &app.advisor(),
            json!({ "note": 42 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}
