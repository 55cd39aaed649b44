use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Document kinds accepted for evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    /// PowerPoint slide deck (.pptx)
    Pptx,
    /// Word document (.docx)
    Docx,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Pdf, FileKind::Pptx, FileKind::Docx];

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Pptx => "pptx",
            FileKind::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            FileKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.extension() == ext)
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        // Strip parameters such as "; charset=binary"
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.content_type() == essence)
    }

    /// Resolve the kind from a filename extension, falling back to the declared content type.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Option<Self> {
        filename
            .rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
            .or_else(|| content_type.and_then(Self::from_content_type))
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for FileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| anyhow::anyhow!("Invalid file kind: {}", s))
    }
}

/// Pointer to one uploaded document in object storage.
///
/// `storage_path` is always a server-generated key; `filename` is the
/// sanitized client name kept for display and for the AI service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FileReference {
    pub filename: String,
    pub storage_path: String,
    pub kind: FileKind,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}
