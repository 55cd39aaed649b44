//! Report delivery: decode the rendered PDF and email it to the submitter.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use feedforward_core::models::{EvaluationRequest, ProcessingResult};
use feedforward_core::AppError;

use super::email::{EmailAttachment, Mailer, OutgoingEmail};

pub const REPORT_SUBJECT: &str = "Your Corporate Storytelling Evaluation Report is Ready";

/// Decode base64 report bytes. Whitespace and a `data:` URL prefix are tolerated.
pub fn decode_report_pdf(encoded: &str) -> Result<Vec<u8>, AppError> {
    let trimmed = encoded.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
        None => trimmed,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::DeliveryFailure(format!("Invalid PDF content format: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::DeliveryFailure("PDF content is empty".to_string()));
    }
    Ok(bytes)
}

fn greeting_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

pub fn report_email(request: &EvaluationRequest, pdf: Vec<u8>) -> OutgoingEmail {
    let name = greeting_name(&request.email);
    let text = format!(
        "Dear {},\n\n\
         Your corporate storytelling evaluation report is ready!\n\n\
         We've completed a comprehensive analysis of your content and generated a detailed PDF report \
         with our findings and recommendations.\n\n\
         Please find the report attached to this email.\n\n\
         Submission ID: {}\n\n\
         Best regards,\nFeedforward AI Team",
        name, request.id
    );
    let html = format!(
        "<h2>Your Evaluation Report is Ready!</h2>\
         <p>Dear {},</p>\
         <p>Your corporate storytelling evaluation report is ready!</p>\
         <p><strong>Please find the report attached to this email.</strong></p>\
         <p>Submission ID: {}</p>\
         <p>Best regards,<br><strong>Feedforward AI Team</strong></p>",
        name, request.id
    );

    OutgoingEmail {
        to: request.email.clone(),
        subject: REPORT_SUBJECT.to_string(),
        text,
        html: Some(html),
        attachments: vec![EmailAttachment {
            filename: format!("evaluation-report-{}.pdf", request.id),
            content_type: "application/pdf".to_string(),
            content: pdf,
        }],
    }
}

/// Email the rendered report for a completed request.
#[tracing::instrument(skip_all, fields(request_id = %request.id))]
pub async fn deliver_report(
    mailer: &dyn Mailer,
    request: &EvaluationRequest,
    result: &ProcessingResult,
) -> Result<(), AppError> {
    let encoded = result
        .report_pdf_base64()
        .ok_or_else(|| AppError::DeliveryFailure("no report content".to_string()))?;
    let pdf = decode_report_pdf(encoded)?;

    if !pdf.starts_with(b"%PDF") {
        let head = String::from_utf8_lossy(&pdf[..pdf.len().min(20)]).into_owned();
        tracing::warn!(first_bytes = %head, "Report content does not look like a PDF");
    }

    let size = pdf.len();
    mailer.send(report_email(request, pdf)).await?;
    tracing::info!(pdf_size = size, "Report delivered");
    Ok(())
}
