//! Request builders and sample payloads.

use axum_test::multipart::{MultipartForm, Part};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::time::Duration;

pub const PDF_MIME: &str = "application/pdf";

/// Smallest byte sequence that looks like a PDF.
pub fn minimal_pdf() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj<<>>endobj\ntrailer<<>>\n%%EOF\n".to_vec()
}

pub fn pdf_base64() -> String {
    STANDARD.encode(minimal_pdf())
}

pub fn pdf_part(filename: &str, bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name(filename).mime_type(PDF_MIME)
}

/// Form with an email and one small PDF.
pub fn submission_form(email: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("email", email.to_string())
        .add_part("files", pdf_part("deck.pdf", minimal_pdf()))
}

/// Form with an email and a URL, no files.
pub fn url_submission_form(email: &str, url: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("email", email.to_string())
        .add_text("url", url.to_string())
}

/// Poll `check` until it holds or a second passes. For effects of spawned tasks.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
