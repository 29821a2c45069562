use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;

/// Header set by the authenticating gateway
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller, as forwarded by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No user identity provided".to_string()))?;

        let user_id = value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| ApiError::Unauthorized(format!("Invalid user id: {}", value)))?;

        Ok(AuthUser { user_id })
    }
}
