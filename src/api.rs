//! # Validation API
//!
//! - `POST /validate` validates each submitted document and answers 200 with
//!   one result per document, valid or not. Malformed requests get a 422
//!   problem object.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document_loader::LoadedDocument;
use crate::engine::{Diagnostic, Severity};
use crate::validator::{ValidateOptions, ValidationEngine, VerdictStatus};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValidationEngine>,
}

impl AppState {
    pub fn new(engine: ValidationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmittedDocument {
    pub content: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub documents: Vec<SubmittedDocument>,
    #[serde(default)]
    pub fail_severity: Option<String>,
    #[serde(default)]
    pub suppress_warnings: Vec<String>,
    #[serde(default)]
    pub suppress_all_warnings: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResult {
    pub source: String,
    pub status: VerdictStatus,
    pub diagnostics: Vec<Diagnostic>,
    pub score: Option<f64>,
}

/// RFC 7807 problem body
#[derive(Debug, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

/// Inline documents cannot fail to load, so every request error is a 422
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body could not be parsed or carries invalid values
    #[error("{0}")]
    Unprocessable(String),
}

impl ApiError {
    fn status_kind_title(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            Self::Unprocessable(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid-request",
                "Invalid validation request",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, title) = self.status_kind_title();
        tracing::debug!(error = %self, "rejected validation request");

        let problem = Problem {
            kind: kind.to_string(),
            title: title.to_string(),
            status: status.as_u16(),
            detail: self.to_string(),
        };
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(problem),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/validate", post(validate))
        .with_state(state)
}

async fn validate(
    State(state): State<AppState>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<Vec<DocumentResult>>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::Unprocessable(e.body_text()))?;
    if request.documents.is_empty() {
        return Err(ApiError::Unprocessable(
            "documents must contain at least one document".to_string(),
        ));
    }

    let fail_severity = match request.fail_severity.as_deref() {
        Some(name) => name.parse::<Severity>().map_err(ApiError::Unprocessable)?,
        None => Severity::Error,
    };
    let options = ValidateOptions {
        fail_severity,
        suppress_warnings: request.suppress_warnings,
        suppress_all_warnings: request.suppress_all_warnings,
    };

    let documents: Vec<LoadedDocument> = request
        .documents
        .into_iter()
        .enumerate()
        .map(|(index, document)| {
            let source = document
                .source
                .unwrap_or_else(|| format!("document-{}", index + 1));
            LoadedDocument::inline(document.content, source)
        })
        .collect();
    tracing::debug!(count = documents.len(), "validating submitted documents");

    let verdicts = state.engine.validate_all(&documents, &options).await;
    let results = documents
        .into_iter()
        .zip(verdicts)
        .map(|(document, verdict)| DocumentResult {
            source: document.source_label,
            status: verdict.status(),
            score: verdict.score,
            diagnostics: verdict.diagnostics,
        })
        .collect();
    Ok(Json(results))
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(addr: &str, state: AppState) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "govlint API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
