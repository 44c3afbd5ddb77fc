use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::{
    api::admin,
    auth::{api as auth_api, auth_middleware, AdminStore, AuthState, JwtHandler},
    chats::ChatStore,
    config::Config,
    middleware::request_logging,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub chat_store: Arc<ChatStore>,
}

impl AppState {
    /// Open the stores and build the token handler from an explicit config
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let jwt_handler =
            Arc::new(JwtHandler::new(&config.jwt_secret).context("Invalid JWT configuration")?);
        let admin_store = Arc::new(AdminStore::open(&config.database.path)?);
        let chat_store = Arc::new(ChatStore::open(&config.database.path)?);

        Ok(Self {
            auth: AuthState::new(admin_store, jwt_handler),
            chat_store,
        })
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    // Public auth routes
    let auth_router = Router::new()
        .route("/auth/login", post(auth_api::login))
        .route("/auth/register", post(auth_api::register))
        .with_state(state.auth.clone());

    // Everything below requires a valid bearer token
    let protected_routes = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/user/:tg_id/chats", get(admin::list_user_chats))
        .route("/auth/me", get(auth_api::get_current_admin))
        .route_layer(middleware::from_fn_with_state(
            state.auth.jwt_handler.clone(),
            auth_middleware,
        ))
        .with_state(state.chat_store.clone());

    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(auth_router)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

async fn root() -> &'static str {
    "Admin Panel Service API is running..."
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Database(anyhow::Error),
    BadRequest(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}
