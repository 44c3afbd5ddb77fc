//! Admin data endpoints (behind the auth gate)

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    api::routes::ApiError,
    auth::AuthenticatedAdmin,
    chats::{ChatMessage, ChatStore, TelegramUser},
};

/// GET /admin/users
pub async fn list_users(
    State(store): State<Arc<ChatStore>>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
) -> Result<Json<Vec<TelegramUser>>, ApiError> {
    tracing::debug!("Admin {} listing users", claims.email);

    let users = tokio::task::spawn_blocking(move || store.list_users())
        .await
        .map_err(anyhow::Error::from)??;

    Ok(Json(users))
}

/// GET /admin/user/:tg_id/chats
pub async fn list_user_chats(
    State(store): State<Arc<ChatStore>>,
    AuthenticatedAdmin(claims): AuthenticatedAdmin,
    Path(tg_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let tg_id: i64 = tg_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid Telegram id: {}", tg_id)))?;

    tracing::debug!("Admin {} reading chats of user {}", claims.email, tg_id);

    let chats = tokio::task::spawn_blocking(move || store.list_chats_for_user(tg_id))
        .await
        .map_err(anyhow::Error::from)??;

    Ok(Json(chats))
}
