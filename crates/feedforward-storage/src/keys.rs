//! Key generation for uploaded documents.

use feedforward_core::models::FileKind;
use uuid::Uuid;

pub const SUBMISSIONS_PREFIX: &str = "submissions";

/// Fresh, collision-resistant key for one uploaded document: `submissions/{uuid}.{ext}`.
pub fn submission_file_key(kind: FileKind) -> String {
    format!("{}/{}.{}", SUBMISSIONS_PREFIX, Uuid::new_v4(), kind.extension())
}
