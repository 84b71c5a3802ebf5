use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::draft::synthesizer::{synthesize_section, DraftRequest};
use crate::errors::AppError;
use crate::language::Language;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub text: String,
    pub language: Language,
    pub attempts_used: u32,
    pub word_count: usize,
}

/// POST /api/v1/draft
///
/// Drafts one section of prose against its paragraph contract.
pub async fn handle_draft_section(
    State(state): State<AppState>,
    Json(request): Json<DraftRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if request.target_length == 0 {
        return Err(AppError::Validation(
            "target_length must be positive".to_string(),
        ));
    }

    let result = synthesize_section(state.llm.as_ref(), &state.config, &request).await?;

    Ok(Json(DraftResponse {
        word_count: result.final_validation.measured_length,
        text: result.text,
        language: result.language,
        attempts_used: result.attempts_used,
    }))
}
