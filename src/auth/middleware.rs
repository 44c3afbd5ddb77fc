//! Authentication Middleware
//! Mission: Protect admin endpoints with JWT validation

use crate::auth::{jwt::JwtHandler, models::Claims};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::{
    authorization::{Authorization, Bearer},
    HeaderMapExt,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Auth middleware that validates JWT tokens
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::MissingToken)?;

    // Validate token and extract claims
    let claims = jwt_handler.verify(&token).map_err(|e| {
        debug!("Auth gate rejected {}: {}", req.uri().path(), e);
        AuthError::InvalidToken
    })?;

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Pull the token out of `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|t| !t.is_empty())
}

/// Verified admin, available to handlers behind `auth_middleware`
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthenticatedAdmin)
            .ok_or(AuthError::MissingToken)
    }
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "No token, authorization denied",
            AuthError::InvalidToken => "Token is not valid",
        };

        (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
    }
}
