//! Authentication API Endpoints
//! Mission: Provide admin login and registration endpoints

use crate::auth::{
    admin_store::{AdminStore, AdminStoreError},
    jwt::JwtHandler,
    middleware::AuthenticatedAdmin,
    models::{AdminResponse, CredentialsRequest, LoginResponse, MessageResponse},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub admin_store: Arc<AdminStore>,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AuthState {
    pub fn new(admin_store: Arc<AdminStore>, jwt_handler: Arc<JwtHandler>) -> Self {
        Self {
            admin_store,
            jwt_handler,
        }
    }
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let Json(payload) = payload?;
    payload.validate().map_err(AuthApiError::validation)?;

    info!("🔐 Login attempt: {}", payload.email);

    // bcrypt is CPU-bound; keep it off the reactor
    let store = state.admin_store.clone();
    let identity = tokio::task::spawn_blocking(move || {
        store.verify(&payload.email, &payload.password)
    })
    .await
    .map_err(|e| AuthApiError::Internal(e.into()))?
    .map_err(|e| {
        if matches!(e, AdminStoreError::InvalidCredentials) {
            warn!("❌ Failed login attempt");
        }
        AuthApiError::from(e)
    })?;

    let token = state.jwt_handler.issue(&identity).map_err(|e| {
        AuthApiError::Internal(anyhow::Error::new(e).context("Failed to issue token"))
    })?;

    info!("✅ Login successful: {}", identity.email);

    Ok(Json(LoginResponse { token }))
}

/// Register endpoint - POST /auth/register
pub async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthApiError> {
    let Json(payload) = payload?;
    payload.validate().map_err(AuthApiError::validation)?;

    let store = state.admin_store.clone();
    let admin = tokio::task::spawn_blocking(move || {
        store.register(&payload.email, &payload.password)
    })
    .await
    .map_err(|e| AuthApiError::Internal(e.into()))??;

    info!("✅ Admin registered: {}", admin.email);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Admin created")),
    ))
}

/// Get current admin info - GET /auth/me
/// Built from the JWT claims (no database lookup needed)
pub async fn get_current_admin(AuthenticatedAdmin(claims): AuthenticatedAdmin) -> Json<AdminResponse> {
    Json(AdminResponse::from_claims(&claims))
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    Validation(String),
    InvalidCredentials,
    DuplicateAdmin,
    Internal(anyhow::Error),
}

impl AuthApiError {
    fn validation(message: impl Into<String>) -> Self {
        AuthApiError::Validation(message.into())
    }
}

impl From<JsonRejection> for AuthApiError {
    fn from(rejection: JsonRejection) -> Self {
        AuthApiError::Validation(rejection.body_text())
    }
}

impl From<AdminStoreError> for AuthApiError {
    fn from(err: AdminStoreError) -> Self {
        match err {
            AdminStoreError::InvalidCredentials | AdminStoreError::AdminNotFound => {
                AuthApiError::InvalidCredentials
            }
            AdminStoreError::DuplicateAdmin => AuthApiError::DuplicateAdmin,
            AdminStoreError::Storage(e) => AuthApiError::Internal(e),
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthApiError::InvalidCredentials => {
                (StatusCode::BAD_REQUEST, "Invalid credentials".to_string())
            }
            AuthApiError::DuplicateAdmin => {
                (StatusCode::BAD_REQUEST, "Admin already exists".to_string())
            }
            AuthApiError::Internal(err) => {
                error!("Auth internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error".to_string(),
                )
            }
        };

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
