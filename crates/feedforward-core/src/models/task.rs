use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::RequestStatus;

/// Body of a processing task. Only the identifier travels; the handler
/// re-reads everything else, so a redelivered task sees current state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub request_id: Uuid,
}

/// How one task invocation ended when it did not fail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The AI call succeeded and the request is now completed.
    Completed { report_delivered: bool },
    /// The request was already terminal; nothing was done.
    AlreadyTerminal { status: RequestStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_camel_case() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(TaskPayload { request_id: id }).unwrap();
        assert_eq!(json["requestId"], id.to_string());
    }

    #[test]
    fn test_outcome_is_tagged() {
        let json = serde_json::to_value(TaskOutcome::AlreadyTerminal {
            status: RequestStatus::Completed,
        })
        .unwrap();
        assert_eq!(json["outcome"], "already_terminal");
        assert_eq!(json["status"], "completed");
    }
}
