use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::AppState;
use super::errors::ApiError;
use crate::risk::{HeatMapEntry, RiskAggregate};
use crate::search::ScoredPassage;
use crate::session::Answer;

const DEFAULT_DOCUMENT_NAME: &str = "document.pdf";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadParams {
    pub filename: Option<String>,
    pub use_ocr: bool,
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub document_name: String,
    pub document_id: u64,
    pub document_type: String,
    pub passages: usize,
    pub risks: usize,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ScoredPassage>,
}

#[derive(Debug, Serialize)]
struct SummaryResponse<'a> {
    status: &'static str,
    documents: &'a BTreeMap<String, RiskAggregate>,
    heat_map: &'a [HeatMapEntry],
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub generation: u64,
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Uploaded document is empty"));
    }

    let document_name = params
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DOCUMENT_NAME);

    let report = state
        .workspace
        .ingest(&body, document_name, params.use_ocr, params.reset)
        .await?;

    Ok(Json(UploadResponse {
        status: "indexed",
        document_name: report.document_name,
        document_id: report.document_id,
        document_type: report.document_type,
        passages: report.passages,
        risks: report.risks,
    }))
}

pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Answer>, ApiError> {
    debug!("Question received ({} chars)", request.question.len());
    let answer = state.workspace.ask(&request.question).await?;
    Ok(Json(answer))
}

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if request.top_k == Some(0) {
        return Err(ApiError::bad_request("top_k must be positive"));
    }
    let results = state
        .workspace
        .search(&request.query, request.top_k)
        .await?;
    Ok(Json(SearchResponse { results }))
}

pub async fn summary(State(state): State<AppState>) -> Response {
    let summary = state.workspace.summary();
    let status = if summary.is_empty() { "empty" } else { "success" };

    Json(SummaryResponse {
        status,
        documents: &summary.documents,
        heat_map: &summary.heat_map,
    })
    .into_response()
}

pub async fn report(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.workspace.report()?;
    info!("Serving {} ({} bytes)", report.file_name, report.bytes.len());

    let headers = [
        (header::CONTENT_TYPE, report.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];
    Ok((headers, report.bytes).into_response())
}

pub async fn reset(State(state): State<AppState>) -> Json<ResetResponse> {
    let generation = state.workspace.reset().await;
    Json(ResetResponse {
        status: "reset",
        generation,
    })
}
