use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::{error::ApiError, state::AppState};

/// Bearer-token guard for form routes. Open when no service token is
/// configured, which is the local development default.
pub struct RequireSession;

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.service_token.as_deref() else {
            return Ok(Self);
        };
        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        match presented {
            Some(token) if token == expected => Ok(Self),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
