use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::middleware::{require_auth, require_teacher};
use crate::{ai, problems, profile};

/// The whole REST surface with state attached.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(alive))
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let teacher_only = middleware::from_fn(require_teacher);

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/profile/me", get(profile::get_profile))
        .route("/api/profile", put(profile::update_profile))
        .route("/api/profile/activity", post(profile::record_activity))
        .route(
            "/api/problems",
            get(problems::list_problems)
                .merge(post(problems::create_problem).route_layer(teacher_only.clone())),
        )
        .route(
            "/api/problems/my-problems",
            get(problems::my_problems).route_layer(teacher_only.clone()),
        )
        .route(
            "/api/ai/generate-problem",
            post(ai::generate_problem).route_layer(teacher_only.clone()),
        )
        .route(
            "/api/ai/generate-test-cases",
            post(ai::generate_test_cases).route_layer(teacher_only.clone()),
        )
        // Outermost, so the teacher gate always sees a CurrentUser
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn alive() -> &'static str {
    "algoMITra API is alive!"
}

async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.db.ping()?;
    Ok(Json(json!({ "status": "ok" })))
}
