//! The evaluation request and its lifecycle.
//!
//! Status moves along `pending -> processing -> completed | failed` and never
//! re-enters an earlier state. Each timestamp is written once by the
//! transition that owns it. Callers own every side effect (persistence,
//! notification); this type only enforces legality.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::FileReference;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    /// Legal successors of this status.
    pub fn allowed_transitions(&self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::Pending => &[RequestStatus::Processing],
            RequestStatus::Processing => &[RequestStatus::Completed, RequestStatus::Failed],
            RequestStatus::Completed | RequestStatus::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Processing => write!(f, "processing"),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "processing" => Ok(RequestStatus::Processing),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid request status: {}", s)),
        }
    }
}

/// Already-validated input for a new submission.
#[derive(Debug, Clone)]
pub struct NewEvaluationRequest {
    pub email: String,
    pub url: Option<String>,
    pub files: Vec<FileReference>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRequest {
    pub id: Uuid,
    pub email: String,
    pub url: Option<String>,
    pub files: Vec<FileReference>,
    pub audience: Option<String>,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result_id: Option<Uuid>,
}

impl EvaluationRequest {
    /// Create a pending request with a fresh identifier.
    ///
    /// Fails when neither a URL nor at least one file is present.
    pub fn new(input: NewEvaluationRequest, submitted_at: DateTime<Utc>) -> Result<Self, AppError> {
        let has_url = input.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        if !has_url && input.files.is_empty() {
            return Err(AppError::from_field_errors(vec![crate::FieldError::new(
                "url",
                crate::validation::codes::MISSING_CONTENT,
                "Either a URL or at least one file must be provided",
            )]));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            email: input.email,
            url: input.url.filter(|_| has_url),
            files: input.files,
            audience: input.audience,
            status: RequestStatus::Pending,
            submitted_at,
            processing_started_at: None,
            completed_at: None,
            error_message: None,
            result_id: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a transition from the table, leaving `self` untouched on error.
    pub fn transition_to(&mut self, next: RequestStatus, at: DateTime<Utc>) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        match next {
            RequestStatus::Processing => {
                self.processing_started_at.get_or_insert(at);
            }
            RequestStatus::Completed | RequestStatus::Failed => {
                self.completed_at.get_or_insert(at);
            }
            RequestStatus::Pending => {}
        }
        self.status = next;
        Ok(())
    }

    /// Enter `processing`. A request already processing is left as is, so a
    /// redelivered task does not error.
    pub fn mark_processing(&mut self, at: DateTime<Utc>) -> Result<(), AppError> {
        if self.status == RequestStatus::Processing {
            self.processing_started_at.get_or_insert(at);
            return Ok(());
        }
        self.transition_to(RequestStatus::Processing, at)
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>, result_id: Uuid) -> Result<(), AppError> {
        self.transition_to(RequestStatus::Completed, at)?;
        self.result_id = Some(result_id);
        Ok(())
    }

    pub fn mark_failed(&mut self, at: DateTime<Utc>, message: impl Into<String>) -> Result<(), AppError> {
        self.transition_to(RequestStatus::Failed, at)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn estimated_completion(&self, offset: Duration) -> DateTime<Utc> {
        self.submitted_at + offset
    }
}
