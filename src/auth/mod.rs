/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWTs identify the caller and their role; project assignments are
 * looked up through [`ProjectAssignments`] and folded into a
 * [`RequestContext`]. The [`gate`] decides what that context may do.
 */

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError, AppState};

pub mod assignments;
pub mod context;
pub mod gate;
pub mod roles;

pub use assignments::{DbProjectAssignments, ProjectAssignments};
pub use context::RequestContext;
pub use roles::Role;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (user ID)
    pub name: Option<String>, // User's display name
    pub role: String,         // One of the `Role` names
    pub jti: String,          // JWT ID
    pub iat: i64,             // Issued at time
    pub exp: i64,             // Expiration time
    pub iss: String,          // Issuer
    pub aud: String,          // Audience
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, jwt_audience: String) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
        )
    }
}

/// Issues and validates bearer tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Signs a token for `user_id` acting as `role`.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        name: Option<String>,
        role: Role,
        ttl: ChronoDuration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            name,
            role: role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => {
                debug!("Rejected bearer token: {}", e);
                AuthError::InvalidToken
            }
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub role: Role,
    pub token_id: String,
}

impl AuthUser {
    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = Role::from_str(&claims.role).map_err(|_| {
            warn!(role = %claims.role, "token carries an unknown role");
            AuthError::UnknownRole(claims.role.clone())
        })?;
        Ok(Self {
            user_id,
            name: claims.name,
            role,
            token_id: claims.jti,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::MissingAuth)?;
        let claims = auth_service.validate_token(token)?;
        AuthUser::from_claims(claims)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let assigned = if user.role.is_project_scoped() {
            state.assignments.assigned_project_ids(user.user_id).await?
        } else {
            Default::default()
        };

        let mut ctx = RequestContext::new(user.user_id, user.role).with_projects(assigned);
        ctx.name = user.name;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "unit-test-secret-that-is-long-enough-for-hs256".into(),
            "assetflow-api".into(),
            "assetflow-clients".into(),
        ))
    }

    #[test]
    fn issued_tokens_validate_and_carry_role() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc
            .issue_token(
                user_id,
                Some("Dana".into()),
                Role::Warehouseman,
                ChronoDuration::minutes(5),
            )
            .unwrap();

        let claims = svc.validate_token(&token).unwrap();
        let user = AuthUser::from_claims(claims).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, Role::Warehouseman);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let svc = service();
        let token = svc
            .issue_token(
                Uuid::new_v4(),
                None,
                Role::SystemAdmin,
                ChronoDuration::minutes(-10),
            )
            .unwrap();
        assert_matches!(svc.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn tokens_for_another_audience_are_rejected() {
        let other = AuthService::new(AuthConfig::new(
            "unit-test-secret-that-is-long-enough-for-hs256".into(),
            "assetflow-api".into(),
            "someone-else".into(),
        ));
        let token = other
            .issue_token(Uuid::new_v4(), None, Role::SystemAdmin, ChronoDuration::minutes(5))
            .unwrap();
        assert_matches!(service().validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn unknown_roles_are_refused() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: None,
            role: "Janitor".into(),
            jti: "j".into(),
            iat: 0,
            exp: 0,
            iss: String::new(),
            aud: String::new(),
        };
        assert_matches!(AuthUser::from_claims(claims), Err(AuthError::UnknownRole(_)));
    }
}
