//! Axum route handlers for the evaluation form and API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::errors::AppError;
use crate::evaluation::pipeline::EvaluationReport;
use crate::extraction::ResumeDocument;
use crate::render::{render, ErrorPage, IndexPage, ResultPage};
use crate::state::AppState;

const MISSING_INPUT: &str = "Please upload a resume and provide a job description.";

/// One form submission: the uploaded resume and the pasted job description.
pub struct Submission {
    pub document: ResumeDocument,
    pub job_description: String,
}

struct UploadedFile {
    bytes: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub configured_model: String,
    pub available_models: Vec<String>,
}

/// Maps a multipart read failure, telling an oversized upload apart from a malformed one.
fn upload_error(e: MultipartError, config: &Config) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "The resume exceeds the {} upload limit.",
            config.upload_limit_label()
        ))
    } else {
        AppError::Validation(format!("Malformed upload: {e}"))
    }
}

/// Reads the `job_description` and `resume` parts of a multipart body.
pub async fn read_submission(
    mut multipart: Multipart,
    config: &Config,
) -> Result<Submission, AppError> {
    let mut job_description = String::new();
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, config))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_description" => {
                job_description = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, config))?;
            }
            "resume" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(e, config))?;
                upload = Some(UploadedFile {
                    bytes,
                    content_type,
                    file_name,
                });
            }
            other => debug!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    let upload = match upload {
        Some(u) if !u.bytes.is_empty() && !job_description.trim().is_empty() => u,
        _ => return Err(AppError::Validation(MISSING_INPUT.to_string())),
    };

    let document = ResumeDocument::from_upload(
        upload.bytes,
        upload.content_type.as_deref(),
        upload.file_name.as_deref(),
    )?;

    Ok(Submission {
        document,
        job_description,
    })
}

async fn evaluate_submission(
    state: &AppState,
    multipart: Multipart,
) -> Result<EvaluationReport, AppError> {
    let submission = read_submission(multipart, &state.config).await?;
    state
        .evaluator
        .evaluate(submission.document, &submission.job_description)
        .await
}

/// GET /
pub async fn handle_index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render(&IndexPage {
        field_set: state.evaluator.field_set().to_string(),
        upload_limit: state.config.upload_limit_label(),
    })
}

/// POST /evaluate
///
/// Form submission. Always answers with HTML; failures render the error page
/// with the status of the underlying error.
pub async fn handle_evaluate_form(State(state): State<AppState>, multipart: Multipart) -> Response {
    match evaluate_submission(&state, multipart).await {
        Ok(report) => render(&ResultPage::from_report(&report)).into_response(),
        Err(err) => error_page(err),
    }
}

fn error_page(err: AppError) -> Response {
    let (status, _, message) = err.parts();
    match render(&ErrorPage {
        status: status.as_u16(),
        message,
    }) {
        Ok(html) => (status, html).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/evaluations
pub async fn handle_create_evaluation(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationReport>, AppError> {
    let report = evaluate_submission(&state, multipart).await?;
    Ok(Json(report))
}

/// GET /api/v1/models
///
/// Operator aid: which models the configured key can use for generation.
pub async fn handle_list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelsResponse>, AppError> {
    let available_models = state.evaluator.generator().list_models().await?;
    Ok(Json(ModelsResponse {
        configured_model: state.config.gemini_model.clone(),
        available_models,
    }))
}
