//! Submission and status API integration tests.
//!
//! Run with: `cargo test -p feedforward-api --test evaluations_test`

mod helpers;

use axum_test::multipart::MultipartForm;
use feedforward_api::services::email::CONFIRMATION_SUBJECT;
use feedforward_db::EvaluationRepository;
use feedforward_storage::Storage;
use serde_json::Value;
use std::future::IntoFuture;
use std::sync::Arc;
use uuid::Uuid;

use helpers::fakes::FailingAdmission;
use helpers::fixtures::{self, eventually};
use helpers::{api_path, setup_test_app, setup_test_app_with, setup_test_app_with_admission};

#[tokio::test]
async fn test_submit_with_file_is_accepted() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form("Alice@Example.com"))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["status"], "pending");
    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    assert!(body["message"].as_str().unwrap().contains("10 minutes"));
    assert_eq!(response.header("x-ratelimit-remaining-email"), "2");
    assert_eq!(response.header("x-ratelimit-remaining-ip"), "4");

    let stored = app.state.repository.get(id).await.unwrap().unwrap();
    assert_eq!(stored.email, "alice@example.com");
    assert_eq!(stored.files.len(), 1);
    assert!(app.state.storage.exists(&stored.files[0].storage_path).await.unwrap());

    let tasks = app.dispatcher.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].request_id, id);

    assert!(eventually(|| app.mailer.sent().iter().any(|e| e.text.contains(&id.to_string()))).await);
}

#[tokio::test]
async fn test_submit_with_url_only_is_accepted() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::url_submission_form(
            "bob@example.com",
            "https://example.com/story",
        ))
        .await;

    assert_eq!(response.status_code(), 201);
    assert!(app.storage.is_empty().await);
}

#[tokio::test]
async fn test_submit_reports_every_field_error() {
    let app = setup_test_app().await;

    let form = MultipartForm::new()
        .add_text("email", "not-an-email")
        .add_text("url", "ftp://example.com");
    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let codes: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["code"].as_str())
        .collect();
    assert!(codes.contains(&"INVALID_EMAIL"));
    assert!(codes.contains(&"INVALID_URL"));
    assert!(app.dispatcher.tasks().is_empty());
}

#[tokio::test]
async fn test_submit_without_content_is_rejected() {
    let app = setup_test_app().await;

    let form = MultipartForm::new().add_text("email", "carol@example.com");
    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["code"], "MISSING_CONTENT");
}

#[tokio::test]
async fn test_file_size_limit_is_inclusive() {
    let app = setup_test_app_with(&[("MAX_FILE_SIZE_BYTES", "1024")]).await;

    let at_limit = MultipartForm::new()
        .add_text("email", "dana@example.com")
        .add_part("files", fixtures::pdf_part("deck.pdf", vec![b'%'; 1024]));
    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(at_limit)
        .await;
    assert_eq!(response.status_code(), 201);

    let over_limit = MultipartForm::new()
        .add_text("email", "dana@example.com")
        .add_part("files", fixtures::pdf_part("deck.pdf", vec![b'%'; 1025]));
    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(over_limit)
        .await;
    assert_eq!(response.status_code(), 413);
    let body: Value = response.json();
    assert_eq!(body["code"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn test_unsupported_file_type_is_rejected() {
    let app = setup_test_app().await;

    let part = axum_test::multipart::Part::bytes(b"MZ".to_vec())
        .file_name("tool.exe")
        .mime_type("application/octet-stream");
    let form = MultipartForm::new()
        .add_text("email", "erin@example.com")
        .add_part("files", part);
    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["details"][0]["code"], "INVALID_FILE_TYPE");
}

#[tokio::test]
async fn test_fourth_submission_per_email_is_rate_limited() {
    let app = setup_test_app_with(&[("IP_RATE_LIMIT", "100")]).await;

    for _ in 0..3 {
        let response = app
            .client()
            .post(&api_path("/evaluations"))
            .multipart(fixtures::submission_form("frank@example.com"))
            .await;
        assert_eq!(response.status_code(), 201);
    }

    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form("FRANK@example.com"))
        .await;

    assert_eq!(response.status_code(), 429);
    let body: Value = response.json();
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["reason"], "email");
    assert_eq!(response.header("x-ratelimit-remaining-email"), "0");
    let retry_after: i64 = response.header("retry-after").to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0);
    assert_eq!(app.dispatcher.tasks().len(), 3);

    let other = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form("grace@example.com"))
        .await;
    assert_eq!(other.status_code(), 201);
}

#[tokio::test]
async fn test_sixth_submission_per_ip_is_rate_limited() {
    let app = setup_test_app().await;

    for i in 0..5 {
        let response = app
            .client()
            .post(&api_path("/evaluations"))
            .multipart(fixtures::submission_form(&format!("user{}@example.com", i)))
            .await;
        assert_eq!(response.status_code(), 201);
    }

    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form("user5@example.com"))
        .await;
    assert_eq!(response.status_code(), 429);
    let body: Value = response.json();
    assert_eq!(body["details"]["reason"], "ip");
}

#[tokio::test]
async fn test_concurrent_submissions_never_exceed_email_limit() {
    let app = setup_test_app_with(&[("IP_RATE_LIMIT", "100")]).await;

    let requests = (0..8).map(|_| {
        app.client()
            .post(&api_path("/evaluations"))
            .multipart(fixtures::submission_form("henry@example.com"))
            .into_future()
    });
    let responses = futures::future::join_all(requests).await;

    let accepted = responses.iter().filter(|r| r.status_code() == 201).count();
    let limited = responses.iter().filter(|r| r.status_code() == 429).count();
    assert_eq!(accepted, 3);
    assert_eq!(limited, 5);
}

#[tokio::test]
async fn test_get_pending_evaluation() {
    let app = setup_test_app().await;

    let created: Value = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form("ivy@example.com"))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    let response = app
        .client()
        .get(&api_path(&format!("/evaluations/{}", id)))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["id"], id);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["email"], "ivy@example.com");
    assert!(body.get("result").is_none());
    assert!(body["estimated_completion_time"].is_string());
}

#[tokio::test]
async fn test_get_unknown_evaluation_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path(&format!("/evaluations/{}", Uuid::new_v4())))
        .await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_malformed_id_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/evaluations/not-a-uuid"))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_health_reports_components() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_openapi_lists_versioned_paths() {
    let app = setup_test_app().await;

    let body: Value = app.client().get("/api/openapi.json").await.json();
    assert!(body["paths"]["/api/v1/evaluations"].is_object());
    assert!(body["paths"]["/api/v1/tasks/process"].is_object());
}

#[tokio::test]
async fn test_broken_admission_store_lets_submissions_through() {
    let app = setup_test_app_with_admission(Arc::new(FailingAdmission)).await;

    for _ in 0..4 {
        let response = app
            .client()
            .post(&api_path("/evaluations"))
            .multipart(fixtures::submission_form("uma@example.com"))
            .await;

        assert_eq!(response.status_code(), 201);
        assert!(response.headers().get("x-ratelimit-remaining-email").is_none());
        assert!(response.headers().get("x-ratelimit-remaining-ip").is_none());
    }
    assert_eq!(app.dispatcher.tasks().len(), 4);
}

#[tokio::test]
async fn test_confirmation_email_failure_does_not_fail_submission() {
    let app = setup_test_app().await;
    app.mailer.fail_on_subject(CONFIRMATION_SUBJECT);

    let response = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form("vera@example.com"))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    assert!(app.repository.get(id).await.unwrap().is_some());
    assert_eq!(app.dispatcher.tasks().len(), 1);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(app.mailer.sent_with_subject(CONFIRMATION_SUBJECT).is_empty());

    let status = app
        .client()
        .get(&api_path(&format!("/evaluations/{}", id)))
        .await;
    assert_eq!(status.status_code(), 200);
}
