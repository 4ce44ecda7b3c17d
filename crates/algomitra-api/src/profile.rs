use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::info;

use algomitra_db::Database;
use algomitra_types::api::{ActivityResponse, ProfileResponse, UpdateProfileRequest};
use algomitra_types::models::{ProfileDetails, Role, User, UserProfile};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;

/// Build the role-specific profile for `user`.
pub(crate) fn load_profile(db: &Database, user: User) -> Result<UserProfile, ApiError> {
    let details = match user.role {
        Role::Student => ProfileDetails::Student {
            submission_activity: db.get_submission_activity(user.id)?,
            badges: user.badges,
        },
        Role::Teacher => ProfileDetails::Teacher {
            problems_authored: db.count_problems_by_author(user.id)?,
        },
    };

    Ok(UserProfile {
        id: user.id,
        name: user.name,
        email: user.email,
        bio: user.bio,
        photo_url: user.photo_url,
        created_at: user.created_at,
        details,
    })
}

/// GET /api/profile/me
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(ProfileResponse {
        success: true,
        user: load_profile(&state.db, user)?,
        message: None,
    }))
}

/// PUT /api/profile: partial update of bio and photo URL.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let updated = state
        .db
        .update_profile(user.id, req.bio.as_deref(), req.photo_url.as_deref())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!("Profile updated for {}", updated.email);

    Ok(Json(ProfileResponse {
        success: true,
        user: load_profile(&state.db, updated)?,
        message: Some("Profile updated successfully.".into()),
    }))
}

/// POST /api/profile/activity: count one submission for today (UTC).
pub async fn record_activity(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let submission_activity = state
        .db
        .record_submission(user.id, Utc::now().date_naive())?;

    Ok(Json(ActivityResponse {
        success: true,
        submission_activity,
    }))
}
