//! Claims handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use validator::Validate;

use core_kernel::ClaimId;
use domain_claims::{Claim, ClaimReport, DocumentUpload};

use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Multipart field carrying uploaded files
const FILES_FIELD: &str = "files";

fn parse_claim_id(raw: &str) -> Result<ClaimId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid claim id: {}", raw)))
}

/// Opens a claim from uploaded documents
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let bytes = field.bytes().await?;
        uploads.push(DocumentUpload::new(filename, bytes.to_vec()));
    }

    let claim = state.processor.upload(uploads).await?;

    Ok(Json(UploadResponse {
        claim_id: claim.id,
        document_count: claim.documents.len(),
        claim_number: claim.claim_number,
        message: UPLOAD_MESSAGE.to_string(),
    }))
}

/// Lists claims, newest first
pub async fn list_claims(
    State(state): State<AppState>,
    Query(params): Query<ListClaimsParams>,
) -> Result<Json<Vec<ClaimSummary>>, ApiError> {
    let claims = state.processor.list(params.into_query()?).await?;
    Ok(Json(claims.iter().map(ClaimSummary::from).collect()))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Claim>, ApiError> {
    let claim = state.processor.get(parse_claim_id(&id)?).await?;
    Ok(Json(claim))
}

/// Deletes a claim
pub async fn delete_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.processor.delete(parse_claim_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Starts classification in the background
pub async fn classify_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TaskAccepted>), ApiError> {
    let id = parse_claim_id(&id)?;
    let claim = state.processor.begin_classification(id).await?;

    let processor = state.processor.clone();
    tokio::spawn(async move {
        if let Err(e) = processor.run_classification(id).await {
            error!(claim_id = %id, error = %e, "Classification task failed");
        }
    });

    info!(claim_id = %id, "Classification started");
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            claim_id: id,
            status: claim.status,
            message: CLASSIFY_MESSAGE.to_string(),
        }),
    ))
}

/// Starts field extraction in the background
pub async fn extract_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TaskAccepted>), ApiError> {
    let id = parse_claim_id(&id)?;
    let claim = state.processor.begin_extraction(id).await?;

    let processor = state.processor.clone();
    tokio::spawn(async move {
        if let Err(e) = processor.run_extraction(id).await {
            error!(claim_id = %id, error = %e, "Extraction task failed");
        }
    });

    info!(claim_id = %id, "Extraction started");
    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            claim_id: id,
            status: claim.status,
            message: EXTRACT_MESSAGE.to_string(),
        }),
    ))
}

/// Evaluates liability synchronously
///
/// The body is optional; without it the product is picked from the catalog
/// default.
pub async fn evaluate_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<EvaluateRequest>>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let id = parse_claim_id(&id)?;
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let evaluation = state
        .processor
        .evaluate(id, request.contract_terms.as_deref())
        .await?;

    Ok(Json(EvaluateResponse {
        claim_id: id,
        liability_result: evaluation,
    }))
}

/// Builds the processing report
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClaimReport>, ApiError> {
    let report = state.processor.report(parse_claim_id(&id)?).await?;
    Ok(Json(report))
}
