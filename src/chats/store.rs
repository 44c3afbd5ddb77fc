//! Chat Storage
//! Mission: Read bot users and their transcripts from SQLite
//!
//! The `users` and `chats` tables are filled by the Telegram bot. The write
//! helpers here back the `seed` command and tests only.

use crate::chats::models::{ChatMessage, ChatRole, TelegramUser};
use crate::db;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    tg_id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL DEFAULT '',
    username TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_created_at
    ON users(created_at DESC);

CREATE TABLE IF NOT EXISTS chats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('user', 'model')),
    text TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chats_user_created
    ON chats(user_id, created_at);
"#;

/// Read access to bot users and chat messages
pub struct ChatStore {
    conn: Mutex<Connection>,
}

impl ChatStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = db::open_with_schema(db_path, SCHEMA_SQL).context("Failed to open chat store")?;

        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .context("Failed to count users")?;
        info!("💬 Chat store initialized at: {} ({} users)", db_path, users);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// All users, newest first
    pub fn list_users(&self) -> Result<Vec<TelegramUser>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT tg_id, first_name, username, created_at
             FROM users ORDER BY created_at DESC, tg_id DESC",
        )?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read users")?;

        debug!("Loaded {} users", users.len());
        Ok(users)
    }

    /// A user's messages, oldest first. Unknown users get an empty list.
    pub fn list_chats_for_user(&self, tg_id: i64) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT id, user_id, role, text, created_at
             FROM chats WHERE user_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;

        let chats = stmt
            .query_map(params![tg_id], row_to_chat)?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read chats for user {}", tg_id))?;

        debug!("Loaded {} chat messages for user {}", chats.len(), tg_id);
        Ok(chats)
    }

    /// Insert a user, or refresh the name fields of an existing one.
    /// `created_at` of an existing user is kept.
    pub fn upsert_user(&self, user: &TelegramUser) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (tg_id, first_name, username, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(tg_id) DO UPDATE SET
                first_name = excluded.first_name,
                username = excluded.username",
            params![
                user.tg_id,
                user.first_name,
                user.username,
                user.created_at.timestamp_millis(),
            ],
        )
        .with_context(|| format!("Failed to upsert user {}", user.tg_id))?;
        Ok(())
    }

    /// Append a message to a user's transcript
    pub fn insert_chat(
        &self,
        user_id: i64,
        role: ChatRole,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chats (user_id, role, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, role, text, created_at.timestamp_millis()],
        )
        .with_context(|| format!("Failed to insert chat for user {}", user_id))?;
        Ok(())
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<TelegramUser> {
    Ok(TelegramUser {
        tg_id: row.get(0)?,
        first_name: row.get(1)?,
        username: row.get(2)?,
        created_at: db::timestamp_column(row, 3)?,
    })
}

fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role: row.get(2)?,
        text: row.get(3)?,
        created_at: db::timestamp_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (ChatStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = ChatStore::open(db_path).unwrap();
        (store, temp_file)
    }

    fn user(tg_id: i64, created_at: DateTime<Utc>) -> TelegramUser {
        TelegramUser {
            tg_id,
            first_name: format!("User {}", tg_id),
            username: Some(format!("user{}", tg_id)),
            created_at,
        }
    }

    #[test]
    fn test_list_users_newest_first() {
        let (store, _temp) = create_test_store();
        let base = Utc::now();

        // Inserted out of order on purpose
        store.upsert_user(&user(2, base + Duration::minutes(5))).unwrap();
        store.upsert_user(&user(1, base)).unwrap();
        store.upsert_user(&user(3, base + Duration::minutes(10))).unwrap();

        let users = store.list_users().unwrap();
        let ids: Vec<i64> = users.iter().map(|u| u.tg_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert!(users
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let (store, _temp) = create_test_store();
        let first_seen = Utc::now() - Duration::days(3);

        store.upsert_user(&user(7, first_seen)).unwrap();

        let mut renamed = user(7, Utc::now());
        renamed.first_name = "Renamed".to_string();
        renamed.username = None;
        store.upsert_user(&renamed).unwrap();

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].first_name, "Renamed");
        assert_eq!(users[0].username, None);
        assert_eq!(
            users[0].created_at.timestamp_millis(),
            first_seen.timestamp_millis()
        );
    }

    #[test]
    fn test_list_chats_oldest_first() {
        let (store, _temp) = create_test_store();
        let base = Utc::now();

        store
            .insert_chat(42, ChatRole::Model, "second", base + Duration::seconds(2))
            .unwrap();
        store.insert_chat(42, ChatRole::User, "first", base).unwrap();
        store
            .insert_chat(99, ChatRole::User, "someone else", base)
            .unwrap();
        store
            .insert_chat(42, ChatRole::User, "third", base + Duration::seconds(5))
            .unwrap();

        let chats = store.list_chats_for_user(42).unwrap();
        let texts: Vec<&str> = chats.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(chats.iter().all(|c| c.user_id == 42));
        assert_eq!(chats[1].role, ChatRole::Model);
        assert!(chats
            .windows(2)
            .all(|pair| pair[0].created_at <= pair[1].created_at));
    }

    #[test]
    fn test_same_timestamp_keeps_insertion_order() {
        let (store, _temp) = create_test_store();
        let at = Utc::now();

        store.insert_chat(5, ChatRole::User, "question", at).unwrap();
        store.insert_chat(5, ChatRole::Model, "answer", at).unwrap();

        let chats = store.list_chats_for_user(5).unwrap();
        assert_eq!(chats[0].text, "question");
        assert_eq!(chats[1].text, "answer");
        assert!(chats[0].id < chats[1].id);
    }

    #[test]
    fn test_open_rejects_non_database_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), vec![b'x'; 4096]).unwrap();

        let result = ChatStore::open(temp_file.path().to_str().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_user_has_no_chats() {
        let (store, _temp) = create_test_store();

        let chats = store.list_chats_for_user(123_456).unwrap();
        assert!(chats.is_empty());
    }
}
