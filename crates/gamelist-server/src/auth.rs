use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::state::AppState;

/// Authentication configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for mutating API calls. None = auth disabled.
    pub bearer_token: Option<String>,
}

impl AuthConfig {
    /// Check the `Authorization` header against the configured token.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let Some(ref expected) = self.bearer_token else {
            return Ok(());
        };

        let provided = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match provided {
            Some(token) if token == expected => Ok(()),
            Some(_) => Err(AppError::Unauthorized("Invalid bearer token".to_string())),
            None => Err(AppError::Unauthorized("Missing bearer token".to_string())),
        }
    }
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Axum middleware requiring the bearer token on every non-read request.
/// Reads are always allowed; with no token configured everything is allowed.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_read_only(request.method()) {
        state.auth.check(request.headers())?;
    }
    Ok(next.run(request).await)
}
