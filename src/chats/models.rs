//! Bot user and chat transcript records

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

/// A Telegram user the bot has talked to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramUser {
    pub tg_id: i64,
    pub first_name: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

// The frontend keys list rows on `_id`; for users that is the Telegram id.
impl Serialize for TelegramUser {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.username.is_some() { 5 } else { 4 };
        let mut state = serializer.serialize_struct("TelegramUser", fields)?;
        state.serialize_field("_id", &self.tg_id)?;
        state.serialize_field("tgId", &self.tg_id)?;
        state.serialize_field("firstName", &self.first_name)?;
        match &self.username {
            Some(username) => state.serialize_field("username", username)?,
            None => state.skip_field("username")?,
        }
        state.serialize_field("createdAt", &self.created_at)?;
        state.end()
    }
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,  // the Telegram user
    Model, // the bot's language model
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "model" => Some(ChatRole::Model),
            _ => None,
        }
    }
}

impl ToSql for ChatRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ChatRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        ChatRole::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown chat role: {}", raw).into()))
    }
}

/// One message in a user's conversation with the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: i64,
    pub user_id: i64, // tgId of the owning user
    pub role: ChatRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
