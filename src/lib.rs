//! Chat Admin Backend Library
//!
//! Admin API for a Telegram bot: administrators log in with email and
//! password, receive a JWT, and use it to read the bot's users and their
//! chat transcripts.

pub mod api;
pub mod auth;
pub mod chats;
pub mod config;
pub mod db;
pub mod middleware;

pub use api::{create_router, AppState};
pub use config::Config;
