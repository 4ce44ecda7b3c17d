use axum::{Json, extract::State};
use tracing::error;

use algomitra_types::api::{
    GenerateProblemRequest, GenerateProblemResponse, GenerateTestCasesRequest,
    GenerateTestCasesResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;

/// POST /api/ai/generate-problem (teachers only)
pub async fn generate_problem(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateProblemRequest>,
) -> Result<Json<GenerateProblemResponse>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::Validation("Prompt is required.".into()));
    }

    let problem = state
        .gemini
        .generate_problem(&req.prompt, req.difficulty)
        .await
        .map_err(|e| {
            error!("AI problem generation failed: {}", e);
            ApiError::Generation("Failed to generate AI problem. Please try again.".into())
        })?;

    Ok(Json(GenerateProblemResponse {
        success: true,
        problem,
    }))
}

/// POST /api/ai/generate-test-cases (teachers only)
pub async fn generate_test_cases(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateTestCasesRequest>,
) -> Result<Json<GenerateTestCasesResponse>, ApiError> {
    let existing = match req.test_cases {
        Some(cases) if !req.description.trim().is_empty() => cases,
        _ => {
            return Err(ApiError::Validation(
                "Problem description and sample test cases are required.".into(),
            ));
        }
    };

    let test_cases = state
        .gemini
        .generate_test_cases(&req.description, &existing)
        .await
        .map_err(|e| {
            error!("AI test case generation failed: {}", e);
            ApiError::Generation("Failed to generate AI test cases. Please try again.".into())
        })?;

    Ok(Json(GenerateTestCasesResponse {
        success: true,
        test_cases,
    }))
}
