//! Bearer-token authentication and minimum-role enforcement for the HTTP
//! surface. Tokens are issued elsewhere; this service only validates them.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

use service::manager::ServiceManager;

use crate::errors::ApiError;

/// Shared application context, constructed once at startup and injected into
/// every handler. No ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ServiceManager>,
    pub jwt_secret: String,
}

/// Global role tiers; ordering is the privilege order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "superAdmin")]
    SuperAdmin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

fn decode_claims(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("invalid Authorization format (expect Bearer)"))?;

    let key = DecodingKey::from_secret(state.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            warn!(path = %parts.uri.path(), error = %e, "token validation failed");
            ApiError::unauthorized("invalid or expired token")
        })
}

fn require_role(parts: &Parts, state: &AppState, min: Role) -> Result<Claims, ApiError> {
    let claims = decode_claims(parts, state)?;
    if claims.role < min {
        warn!(path = %parts.uri.path(), sub = %claims.sub, "insufficient role");
        return Err(ApiError::forbidden("insufficient role"));
    }
    Ok(claims)
}

/// Read operations require at least the admin tier.
pub struct RequireAdmin(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).map(Self)
    }
}

/// Mutations require the highest tier.
pub struct RequireSuperAdmin(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::SuperAdmin).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tiers_are_ordered() {
        assert!(Role::User < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);
    }

    #[test]
    fn role_serde_names() {
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"superAdmin\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
