use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use algomitra_db::NewProblem;
use algomitra_types::api::{CreateProblemRequest, MyProblemsResponse, ProblemListResponse, ProblemResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;

/// POST /api/problems (teachers only)
pub async fn create_problem(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateProblemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let difficulty = match req.difficulty {
        Some(d)
            if !title.is_empty()
                && !req.description.trim().is_empty()
                && !req.test_cases.is_empty() =>
        {
            d
        }
        _ => {
            return Err(ApiError::Validation(
                "Please provide all fields: title, description, difficulty, and at least one test case."
                    .into(),
            ));
        }
    };

    if state.db.title_exists(&title)? {
        return Err(ApiError::Conflict("A problem with this title already exists.".into()));
    }

    let problem = state.db.create_problem(&NewProblem {
        title,
        description: req.description,
        difficulty,
        test_cases: req.test_cases,
        created_by: user.id,
    })?;

    info!(
        "Problem '{}' created by {} with {} test cases",
        problem.title,
        user.email,
        problem.test_cases.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(ProblemResponse {
            success: true,
            problem: problem.view_for(user.id),
            message: "Problem created successfully.".into(),
        }),
    ))
}

/// GET /api/problems: every problem, expected outputs hidden from
/// everyone but the author.
pub async fn list_problems(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ProblemListResponse>, ApiError> {
    // Run the full scan off the async runtime
    let app = state.clone();
    let problems = tokio::task::spawn_blocking(move || app.db.list_problems())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(ProblemListResponse {
        success: true,
        problems: problems.iter().map(|p| p.view_for(user.id)).collect(),
    }))
}

/// GET /api/problems/my-problems (teachers only)
pub async fn my_problems(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<MyProblemsResponse>, ApiError> {
    Ok(Json(MyProblemsResponse {
        success: true,
        problems: state.db.list_problems_by_author(user.id)?,
    }))
}
