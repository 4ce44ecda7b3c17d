pub mod ai;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod problems;
pub mod profile;
pub mod routes;

pub use auth::{AppState, AppStateInner, AuthConfig};
pub use error::ApiError;
pub use routes::router;
