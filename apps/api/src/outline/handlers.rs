use axum::extract::State;
use axum::Json;

use crate::errors::AppError;
use crate::outline::engine::{generate_outline, OutlineRequest, OutlineResponse};
use crate::state::AppState;

const MIN_TOTAL_LENGTH: u32 = 150;

/// POST /api/v1/outline
///
/// Builds a budgeted section outline for a document, or regenerates a
/// single section in place when `regenerate_section_index` is set.
pub async fn handle_generate_outline(
    State(state): State<AppState>,
    Json(request): Json<OutlineRequest>,
) -> Result<Json<OutlineResponse>, AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if request.total_length < MIN_TOTAL_LENGTH {
        return Err(AppError::Validation(format!(
            "total_length must be at least {MIN_TOTAL_LENGTH}"
        )));
    }
    if request.regenerate_section_index.is_some() && request.current_outline_text.is_none() {
        return Err(AppError::Validation(
            "regenerate_section_index requires current_outline_text".to_string(),
        ));
    }

    let response = generate_outline(state.llm.as_ref(), &state.config, &request).await?;

    Ok(Json(response))
}
