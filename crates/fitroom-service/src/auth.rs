//! Authentication extractors.
//!
//! Token issuance and verification live in the upstream identity layer (an
//! edge proxy terminates end-user auth); this service receives the already
//! authenticated subject id as the bearer value. Worker endpoints use a
//! shared service API key instead.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use fitroom_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated end user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let subject = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let user_id = subject
            .trim()
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self { user_id })
    }
}

/// A service-to-service caller authenticated by the shared API key.
#[derive(Debug, Clone, Copy)]
pub struct ServiceAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // A missing key is an operator fault, not a caller fault; fail
        // loudly instead of treating every caller as unauthorized.
        let expected = state.config.service_api_key.as_deref().ok_or_else(|| {
            ApiError::Configuration("SERVICE_API_KEY is not configured".into())
        })?;

        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        if crate::crypto::constant_time_eq(provided, expected) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}
