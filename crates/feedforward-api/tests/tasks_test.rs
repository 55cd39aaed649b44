//! Task processing integration tests: AI call, persistence, report delivery.
//!
//! Run with: `cargo test -p feedforward-api --test tasks_test`

mod helpers;

use serde_json::{json, Value};
use uuid::Uuid;

use feedforward_api::services::report_delivery::REPORT_SUBJECT;
use feedforward_core::models::RequestStatus;
use feedforward_db::EvaluationRepository;

use helpers::fakes::{AiBehavior, RepoOp};
use helpers::{api_path, fixtures, setup_test_app, setup_test_app_with, TestApp};

async fn submit(app: &TestApp, email: &str) -> Uuid {
    let body: Value = app
        .client()
        .post(&api_path("/evaluations"))
        .multipart(fixtures::submission_form(email))
        .await
        .json();
    body["id"].as_str().unwrap().parse().unwrap()
}

async fn process(app: &TestApp, id: Uuid) -> axum_test::TestResponse {
    app.client()
        .post(&api_path("/tasks/process"))
        .json(&json!({ "requestId": id }))
        .await
}

#[tokio::test]
async fn test_process_completes_and_delivers_report() {
    let app = setup_test_app().await;
    let id = submit(&app, "jack@example.com").await;

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["requestId"], id.to_string());
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["report_delivered"], true);

    let reports = app.mailer.sent_with_subject(REPORT_SUBJECT);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].to, "jack@example.com");
    assert_eq!(reports[0].attachments.len(), 1);
    assert_eq!(reports[0].attachments[0].content, fixtures::minimal_pdf());

    let status: Value = app
        .client()
        .get(&api_path(&format!("/evaluations/{}", id)))
        .await
        .json();
    assert_eq!(status["status"], "completed");
    assert!(status["completed_at"].is_string());
    assert!(status["processing_started_at"].is_string());
    assert_eq!(status["result"]["assessments"]["clarity"], 4);
    assert!(status.get("estimated_completion_time").is_none());
}

#[tokio::test]
async fn test_redelivered_task_is_a_no_op() {
    let app = setup_test_app().await;
    let id = submit(&app, "kate@example.com").await;

    assert_eq!(process(&app, id).await.status_code(), 200);
    let second = process(&app, id).await;

    assert_eq!(second.status_code(), 200);
    let body: Value = second.json();
    assert_eq!(body["outcome"], "already_terminal");
    assert_eq!(body["status"], "success");
    assert_eq!(app.ai.calls(), 1);
    assert_eq!(app.mailer.sent_with_subject(REPORT_SUBJECT).len(), 1);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let app = setup_test_app().await;

    let response = process(&app, Uuid::new_v4()).await;

    assert_eq!(response.status_code(), 404);
    assert_eq!(app.ai.calls(), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/tasks/process"))
        .json(&json!({ "requestId": "nope" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_ai_timeout_marks_request_failed() {
    let app = setup_test_app().await;
    app.ai.set(AiBehavior::Timeout);
    let id = submit(&app, "liam@example.com").await;

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 504);
    let body: Value = response.json();
    assert_eq!(body["code"], "UPSTREAM_TIMEOUT");

    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(request
        .error_message
        .as_deref()
        .unwrap()
        .contains("timed out"));
    assert!(request.completed_at.is_some());
    assert!(app.mailer.sent_with_subject(REPORT_SUBJECT).is_empty());

    // A failed request is terminal; redelivery does not call the AI again
    let retry = process(&app, id).await;
    assert_eq!(retry.status_code(), 200);
    assert_eq!(app.ai.calls(), 1);
}

#[tokio::test]
async fn test_ai_failure_is_tracked() {
    let app = setup_test_app().await;
    app.ai.set(AiBehavior::Fail("model overloaded".to_string()));
    let id = submit(&app, "mia@example.com").await;

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 502);
    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert_eq!(request.error_message.as_deref(), Some("model overloaded"));

    let snapshot = app.state.observability.snapshot(None);
    assert_eq!(snapshot.errors.total, 1);
    assert_eq!(snapshot.metrics.failure_count, 1);
}

#[tokio::test]
async fn test_delivery_failure_still_completes() {
    let app = setup_test_app().await;
    app.mailer.fail_on_subject(REPORT_SUBJECT);
    let id = submit(&app, "noah@example.com").await;

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["report_delivered"], false);

    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert!(app.repository.get_result(id).await.unwrap().is_some());

    let snapshot = app.state.observability.snapshot(None);
    assert_eq!(snapshot.errors.by_category.get("DeliveryFailure"), Some(&1));
}

#[tokio::test]
async fn test_missing_pdf_is_a_delivery_failure() {
    let app = setup_test_app().await;
    app.ai.set(AiBehavior::Succeed { pdf: false });
    let id = submit(&app, "olivia@example.com").await;

    let body: Value = process(&app, id).await.json();

    assert_eq!(body["outcome"], "completed");
    assert_eq!(body["report_delivered"], false);
    assert!(app.mailer.sent_with_subject(REPORT_SUBJECT).is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint_reports_outcomes() {
    let app = setup_test_app().await;
    let ok = submit(&app, "paul@example.com").await;
    process(&app, ok).await;
    app.ai.set(AiBehavior::Fail("boom".to_string()));
    let failed = submit(&app, "quinn@example.com").await;
    process(&app, failed).await;

    let response = app.client().get(&api_path("/metrics")).await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["metrics"]["count"], 2);
    assert_eq!(body["metrics"]["success_count"], 1);
    assert_eq!(body["metrics"]["failure_count"], 1);
    assert_eq!(body["errors"]["total"], 1);
    assert!(body["alerts"].is_array());
}

#[tokio::test]
async fn test_metrics_window_beyond_time_range_counts_everything() {
    let app = setup_test_app().await;
    let id = submit(&app, "rita@example.com").await;
    process(&app, id).await;

    let response = app
        .client()
        .get(&api_path("/metrics?window=18446744073709551615"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["metrics"]["count"], 1);
    assert_eq!(body["metrics"]["success_count"], 1);
}

#[tokio::test]
async fn test_hanging_ai_call_hits_configured_deadline() {
    let app = setup_test_app_with(&[("AI_TIMEOUT_SECONDS", "1")]).await;
    app.ai.set(AiBehavior::Hang);
    let id = submit(&app, "sara@example.com").await;

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 504);
    let body: Value = response.json();
    assert_eq!(body["code"], "UPSTREAM_TIMEOUT");

    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert_eq!(
        request.error_message.as_deref(),
        Some("AI processing timed out after 1 second")
    );
}

#[tokio::test]
async fn test_failed_processing_write_marks_request_failed() {
    let app = setup_test_app().await;
    let id = submit(&app, "tom@example.com").await;
    app.repository.fail_call(RepoOp::Update, 1);

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 500);
    assert_eq!(app.ai.calls(), 0);
    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(request.processing_started_at.is_some());
    assert!(request.completed_at.is_some());
}

#[tokio::test]
async fn test_failed_refetch_marks_request_failed() {
    let app = setup_test_app().await;
    let id = submit(&app, "ursula@example.com").await;
    // First read loads the request, second is the re-check after the AI call
    app.repository.fail_call(RepoOp::Get, 2);

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 500);
    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(app.mailer.sent_with_subject(REPORT_SUBJECT).is_empty());
}

#[tokio::test]
async fn test_failed_result_save_counts_as_failure() {
    let app = setup_test_app().await;
    let id = submit(&app, "victor@example.com").await;
    app.repository.fail_call(RepoOp::SaveResult, 1);

    let response = process(&app, id).await;

    assert_eq!(response.status_code(), 500);
    let request = app.repository.get(id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Failed);
    assert!(app.repository.get_result(id).await.unwrap().is_none());

    let snapshot = app.state.observability.snapshot(None);
    assert_eq!(snapshot.metrics.success_count, 0);
    assert_eq!(snapshot.metrics.failure_count, 1);
    assert_eq!(snapshot.errors.total, 1);
}
