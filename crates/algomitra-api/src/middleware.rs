use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tracing::debug;

use algomitra_types::models::{Role, User};

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;

/// The user behind a verified bearer token, loaded fresh from the database.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Verify the bearer token and attach the matching user to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::Unauthorized("Not authorized, no token".into()))?;

    let claims = decode_token(&state.auth, bearer.token()).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthorized("Not authorized, token failed".into())
    })?;

    let user = state
        .db
        .get_user_by_id(claims.sub)?
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, user not found".into()))?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Teacher-only gate. Must sit inside `require_auth`.
pub async fn require_teacher(req: Request, next: Next) -> Result<Response, ApiError> {
    let role = req.extensions().get::<CurrentUser>().map(|u| u.0.role);
    match role {
        Some(Role::Teacher) => Ok(next.run(req).await),
        Some(Role::Student) => Err(ApiError::Forbidden(
            "Access denied. This route is for teachers only.".into(),
        )),
        None => Err(ApiError::Unauthorized("Not authorized, no token".into())),
    }
}
