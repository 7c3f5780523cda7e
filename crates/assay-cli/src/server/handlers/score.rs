//! Upload scoring handlers.

use std::sync::Arc;

use assay::{Assay, GroupKind, Parser, Table};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Scope of one scoring request.
#[derive(Clone, Copy, Debug)]
pub enum Scope {
    Group(GroupKind),
    All,
}

/// Score an upload with one metric group; the body is that group's metrics map.
pub async fn score_group(
    State(state): State<AppState>,
    kind: GroupKind,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    score_upload(state, Scope::Group(kind), multipart).await
}

/// Score an upload with every group, keyed by group name.
pub async fn score_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    score_upload(state, Scope::All, multipart).await
}

async fn score_upload(state: AppState, scope: Scope, multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let (name, bytes) = read_upload(multipart).await?;
    info!(file = %name, size = bytes.len(), ?scope, "Scoring upload");

    let parser = Arc::clone(&state.parser);
    let assay = Arc::clone(&state.assay);
    let report = tokio::task::spawn_blocking(move || score_bytes(&parser, &assay, scope, &name, &bytes))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(report))
}

fn score_bytes(
    parser: &Parser,
    assay: &Assay,
    scope: Scope,
    name: &str,
    bytes: &[u8],
) -> Result<Value, ApiError> {
    let (data, _metadata) = parser.parse_bytes_named(name, bytes)?;
    let table = Table::from_data_table(&data)?;
    Ok(match scope {
        Scope::Group(kind) => assay.score(&table, kind).to_json(),
        Scope::All => assay.report(&table),
    })
}

/// First `file` field of the form: its file name and contents.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        return Ok((name, bytes));
    }
    Err(ApiError::BadRequest(format!(
        "missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}
