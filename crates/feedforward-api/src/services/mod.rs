pub mod ai_client;
pub mod email;
pub mod observability;
pub mod report_delivery;
pub mod retention;
pub mod submission;

pub use ai_client::{AiClient, AiProcessingRequest, HttpAiClient};
pub use email::{create_mailer, Mailer, NoopMailer, OutgoingEmail, SmtpMailer};
pub use observability::{ObservabilitySnapshot, PipelineObservability};
pub use retention::{RetentionPolicy, RetentionReport, RetentionService};
pub use submission::{AcceptedSubmission, SubmissionUpload, UploadedFile};
