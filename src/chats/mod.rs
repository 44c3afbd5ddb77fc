//! Chat Data Module
//! Mission: Expose the bot's users and conversations to administrators

pub mod models;
pub mod store;

pub use models::{ChatMessage, ChatRole, TelegramUser};
pub use store::ChatStore;
