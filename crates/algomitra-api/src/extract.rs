use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` whose rejections come back in the API error envelope
/// instead of axum's plain-text body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
