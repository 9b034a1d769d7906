//! Axum route handlers for the resume library.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::resumes::{Resume, ResumeLibrary};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeListResponse {
    pub resumes: Vec<Resume>,
    pub selected_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddResumeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectResumeRequest {
    pub id: String,
}

/// Runs a library mutation on the blocking pool. The file repository writes synchronously.
async fn mutate_library<T, F>(state: &AppState, mutation: F) -> Result<T, AppError>
where
    F: FnOnce(&mut ResumeLibrary) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let resumes = state.resumes.clone();
    tokio::task::spawn_blocking(move || {
        let mut library = resumes.lock();
        mutation(&mut *library)
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(State(state): State<AppState>) -> Json<ResumeListResponse> {
    let library = state.resumes.lock();
    Json(ResumeListResponse {
        resumes: library.resumes().to_vec(),
        selected_id: library.selected_id().map(String::from),
    })
}

/// POST /api/v1/resumes
pub async fn handle_add_resume(
    State(state): State<AppState>,
    Json(req): Json<AddResumeRequest>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let resume = mutate_library(&state, move |library| library.add(&req.name, &req.content)).await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    mutate_library(&state, move |library| library.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/resumes/selection
pub async fn handle_select_resume(
    State(state): State<AppState>,
    Json(req): Json<SelectResumeRequest>,
) -> Result<StatusCode, AppError> {
    mutate_library(&state, move |library| library.select(&req.id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
