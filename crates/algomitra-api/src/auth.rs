use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use algomitra_ai::GeminiClient;
use algomitra_db::{Database, NewUser};
use algomitra_types::api::{AuthResponse, AuthUser, Claims, LoginRequest, ProfileResponse, RegisterRequest};
use algomitra_types::models::{Role, User};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::profile::load_profile;

pub const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub auth: AuthConfig,
    pub gemini: GeminiClient,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Suffix every account email must end with, including the `@`.
    pub allowed_email_domain: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, allowed_email_domain: &str) -> Self {
        let domain = allowed_email_domain.trim().to_lowercase();
        let allowed_email_domain = if domain.starts_with('@') {
            domain
        } else {
            format!("@{}", domain)
        };
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: chrono::Duration::days(3),
            allowed_email_domain,
        }
    }

    pub fn with_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    let email = normalize_email(&req.email);
    let role = req.role.trim();

    if name.is_empty() || email.is_empty() || req.password.is_empty() || role.is_empty() {
        return Err(ApiError::Validation(
            "Please provide all required fields (name, email, password, role).".into(),
        ));
    }

    check_email(&email, &state.auth.allowed_email_domain)?;

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }

    let role: Role = role.parse().map_err(|_| {
        ApiError::Validation("Invalid role. Must be \"student\" or \"teacher\".".into())
    })?;

    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists.".into()));
    }

    let password_hash = hash_password(req.password).await?;

    let user = state.db.create_user(&NewUser {
        name: name.to_string(),
        email,
        password_hash,
        role,
    })?;

    let token = create_token(&state.auth, user.id, user.role)
        .map_err(|e| ApiError::internal("Token signing failed", e))?;

    info!("Registered {} as {}", user.email, user.role);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: auth_user(&user),
            message: "User registered successfully.".into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);

    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide both email and password.".into(),
        ));
    }

    let domain = &state.auth.allowed_email_domain;
    if !email.ends_with(domain.as_str()) {
        return Err(ApiError::Unauthorized(format!(
            "Invalid credentials. Please use a {} email.",
            domain
        )));
    }

    let record = state
        .db
        .get_user_by_email(&email)?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(req.password, record.password_hash).await? {
        warn!("Failed login for {}", email);
        return Err(invalid_credentials());
    }

    let user = record.user;
    let token = create_token(&state.auth, user.id, user.role)
        .map_err(|e| ApiError::internal("Token signing failed", e))?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: auth_user(&user),
        message: "User logged in successfully.".into(),
    }))
}

/// GET /api/auth/me: the authenticated user, password excluded.
pub async fn me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(ProfileResponse {
        success: true,
        user: load_profile(&state.db, user)?,
        message: None,
    }))
}

pub fn create_token(config: &AuthConfig, user_id: Uuid, role: Role) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + config.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// Check signature and expiry.
pub fn decode_token(config: &AuthConfig, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials.".into())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn check_email(email: &str, allowed_domain: &str) -> Result<(), ApiError> {
    if !email.validate_email() {
        return Err(ApiError::Validation("Please provide a valid email.".into()));
    }
    if !email.ends_with(allowed_domain) {
        return Err(ApiError::Validation(format!(
            "Invalid email. Only {} addresses are allowed.",
            allowed_domain
        )));
    }
    Ok(())
}

// Argon2 hashing and verification run on the blocking pool.

async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?
    .map_err(|e| ApiError::internal("Password hashing failed", e))
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)?;
        Ok::<_, argon2::password_hash::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?
    .map_err(|e| ApiError::internal("Stored password hash is unreadable", e))
}
