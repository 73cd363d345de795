//! Upload wizard handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use validator::Validate;

use core_kernel::SessionId;
use domain_claims::{wizard::complete_after, WizardSnapshot};

use crate::dto::wizard::SelectFilesRequest;
use crate::error::{ApiError, SESSION_NOT_FOUND};
use crate::sessions::SharedSession;
use crate::AppState;

async fn find_session(state: &AppState, raw: &str) -> Result<SharedSession, ApiError> {
    let id: SessionId = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid session id: {}", raw)))?;
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(SESSION_NOT_FOUND.to_string()))
}

/// Opens a wizard session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<WizardSnapshot>) {
    let session = state.sessions.create().await;
    let snapshot = session.read().await.snapshot();
    (StatusCode::CREATED, Json(snapshot))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WizardSnapshot>, ApiError> {
    let session = find_session(&state, &id).await?;
    let snapshot = session.read().await.snapshot();
    Ok(Json(snapshot))
}

/// Replaces the selected files
pub async fn select_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectFilesRequest>,
) -> Result<Json<WizardSnapshot>, ApiError> {
    request.validate()?;
    let session = find_session(&state, &id).await?;

    let mut guard = session.write().await;
    guard.select_files(request.into_files());
    Ok(Json(guard.snapshot()))
}

/// Removes one selected file by name
pub async fn remove_file(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<WizardSnapshot>, ApiError> {
    let session = find_session(&state, &id).await?;

    let mut guard = session.write().await;
    if !guard.remove_file(&name) {
        return Err(ApiError::NotFound(format!("File not selected: {}", name)));
    }
    Ok(Json(guard.snapshot()))
}

/// Starts simulated processing; results appear after the configured delay
pub async fn start_processing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<WizardSnapshot>), ApiError> {
    let session = find_session(&state, &id).await?;

    let (ticket, snapshot) = {
        let mut guard = session.write().await;
        let ticket = guard.start_processing()?;
        (ticket, guard.snapshot())
    };

    let delay = state.config.wizard.processing_delay();
    tokio::spawn(async move {
        let completed = complete_after(&session, ticket, delay).await;
        debug!(generation = ticket.generation(), completed, "Wizard processing finished");
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// Clears the session back to the first step
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WizardSnapshot>, ApiError> {
    let session = find_session(&state, &id).await?;

    let mut guard = session.write().await;
    guard.reset();
    Ok(Json(guard.snapshot()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: SessionId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid session id: {}", id)))?;
    if !state.sessions.remove(id).await {
        return Err(ApiError::NotFound(SESSION_NOT_FOUND.to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
