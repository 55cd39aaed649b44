use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedforward_core::models::{
    EvaluationRequest, FileReference, ProcessingResult, RequestStatus, ResultStatus,
};
use feedforward_core::AppError;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::EvaluationRepository;

const REQUEST_COLUMNS: &str = "id, email, url, files, audience, status, submitted_at, \
     processing_started_at, completed_at, error_message, result_id";

#[derive(sqlx::FromRow)]
struct EvaluationRow {
    id: Uuid,
    email: String,
    url: Option<String>,
    files: Json<Vec<FileReference>>,
    audience: Option<String>,
    status: String,
    submitted_at: DateTime<Utc>,
    processing_started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    result_id: Option<Uuid>,
}

impl TryFrom<EvaluationRow> for EvaluationRequest {
    type Error = AppError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let status: RequestStatus = row
            .status
            .parse()
            .map_err(|e: anyhow::Error| AppError::Internal(e.to_string()))?;
        Ok(EvaluationRequest {
            id: row.id,
            email: row.email,
            url: row.url,
            files: row.files.0,
            audience: row.audience,
            status,
            submitted_at: row.submitted_at,
            processing_started_at: row.processing_started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            result_id: row.result_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    request_id: Uuid,
    audiences: Json<Vec<serde_json::Value>>,
    assessments: Json<serde_json::Value>,
    report: Option<Json<serde_json::Value>>,
    validated_citations: Json<Vec<serde_json::Value>>,
    status: String,
    error: Option<String>,
    pdf_content: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for ProcessingResult {
    type Error = AppError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "completed" => ResultStatus::Completed,
            "failed" => ResultStatus::Failed,
            other => {
                return Err(AppError::Internal(format!(
                    "Invalid result status: {}",
                    other
                )))
            }
        };
        Ok(ProcessingResult {
            request_id: row.request_id,
            audiences: row.audiences.0,
            assessments: row.assessments.0,
            report: row.report.map(|r| r.0),
            validated_citations: row.validated_citations.0,
            status,
            error: row.error,
            pdf_content: row.pdf_content,
            created_at: row.created_at,
        })
    }
}

fn result_status_text(status: ResultStatus) -> &'static str {
    match status {
        ResultStatus::Completed => "completed",
        ResultStatus::Failed => "failed",
    }
}

/// Postgres-backed repository over `evaluation_requests` and `processing_results`.
#[derive(Clone)]
pub struct PgEvaluationRepository {
    pool: PgPool,
}

impl PgEvaluationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(
        &self,
        where_clause: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        let sql = format!(
            "SELECT {} FROM evaluation_requests WHERE {} ORDER BY submitted_at",
            REQUEST_COLUMNS, where_clause
        );
        let rows = sqlx::query_as::<_, EvaluationRow>(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EvaluationRequest::try_from).collect()
    }
}

#[async_trait]
impl EvaluationRepository for PgEvaluationRepository {
    #[tracing::instrument(skip(self, request), fields(request_id = %request.id))]
    async fn create(&self, request: &EvaluationRequest) -> Result<(), AppError> {
        // Dynamic queries so builds do not need DATABASE_URL or sqlx prepare
        sqlx::query(
            r#"
            INSERT INTO evaluation_requests (
                id, email, url, files, audience, status, submitted_at,
                processing_started_at, completed_at, error_message, result_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(request.id)
        .bind(&request.email)
        .bind(&request.url)
        .bind(Json(&request.files))
        .bind(&request.audience)
        .bind(request.status.to_string())
        .bind(request.submitted_at)
        .bind(request.processing_started_at)
        .bind(request.completed_at)
        .bind(&request.error_message)
        .bind(request.result_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<EvaluationRequest>, AppError> {
        let sql = format!(
            "SELECT {} FROM evaluation_requests WHERE id = $1",
            REQUEST_COLUMNS
        );
        let row = sqlx::query_as::<_, EvaluationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(EvaluationRequest::try_from).transpose()
    }

    #[tracing::instrument(skip(self, request), fields(request_id = %request.id, status = %request.status))]
    async fn update(&self, request: &EvaluationRequest) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE evaluation_requests
            SET files = $2, status = $3, processing_started_at = $4, completed_at = $5,
                error_message = $6, result_id = $7
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(Json(&request.files))
        .bind(request.status.to_string())
        .bind(request.processing_started_at)
        .bind(request.completed_at)
        .bind(&request.error_message)
        .bind(request.result_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Evaluation request {} not found",
                request.id
            )));
        }
        Ok(())
    }

    async fn save_result(&self, result: &ProcessingResult) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO processing_results (
                request_id, audiences, assessments, report, validated_citations,
                status, error, pdf_content, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (request_id) DO UPDATE SET
                audiences = EXCLUDED.audiences,
                assessments = EXCLUDED.assessments,
                report = EXCLUDED.report,
                validated_citations = EXCLUDED.validated_citations,
                status = EXCLUDED.status,
                error = EXCLUDED.error,
                pdf_content = EXCLUDED.pdf_content
            "#,
        )
        .bind(result.request_id)
        .bind(Json(&result.audiences))
        .bind(Json(&result.assessments))
        .bind(result.report.as_ref().map(Json))
        .bind(Json(&result.validated_citations))
        .bind(result_status_text(result.status))
        .bind(&result.error)
        .bind(&result.pdf_content)
        .bind(result.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_result(&self, request_id: Uuid) -> Result<Option<ProcessingResult>, AppError> {
        let row = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT request_id, audiences, assessments, report, validated_citations,
                   status, error, pdf_content, created_at
            FROM processing_results
            WHERE request_id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProcessingResult::try_from).transpose()
    }

    async fn delete_result(&self, request_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM processing_results WHERE request_id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<EvaluationRequest>, AppError> {
        let sql = format!(
            "SELECT {} FROM evaluation_requests WHERE email = $1 ORDER BY submitted_at DESC",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query_as::<_, EvaluationRow>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(EvaluationRequest::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        // processing_results rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM evaluation_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_submitted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        self.fetch_many("submitted_at < $1", cutoff).await
    }

    async fn find_completed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        self.fetch_many("completed_at IS NOT NULL AND completed_at < $1", cutoff)
            .await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
