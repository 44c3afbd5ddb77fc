//! Administrator Storage
//! Mission: Persist administrator accounts with SQLite and check credentials

use crate::auth::models::{normalize_email, Admin, AdminIdentity, BCRYPT_COST};
use crate::db;
use anyhow::Context;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension, Row};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS admins (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

lazy_static! {
    // Compared against when the email is unknown so both failure paths cost one bcrypt check.
    static ref DUMMY_HASH: String =
        bcrypt::hash("timing-equalizer", BCRYPT_COST).unwrap_or_default();
}

/// Administrator store errors
#[derive(Debug)]
pub enum AdminStoreError {
    DuplicateAdmin,
    InvalidCredentials,
    AdminNotFound,
    Storage(anyhow::Error),
}

impl fmt::Display for AdminStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminStoreError::DuplicateAdmin => write!(f, "Admin already exists"),
            AdminStoreError::InvalidCredentials => write!(f, "Invalid credentials"),
            AdminStoreError::AdminNotFound => write!(f, "Admin not found"),
            AdminStoreError::Storage(e) => write!(f, "Admin storage failure: {:#}", e),
        }
    }
}

impl std::error::Error for AdminStoreError {}

impl From<anyhow::Error> for AdminStoreError {
    fn from(err: anyhow::Error) -> Self {
        AdminStoreError::Storage(err)
    }
}

impl From<rusqlite::Error> for AdminStoreError {
    fn from(err: rusqlite::Error) -> Self {
        AdminStoreError::Storage(err.into())
    }
}

impl From<bcrypt::BcryptError> for AdminStoreError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AdminStoreError::Storage(anyhow::Error::new(err).context("Failed to hash password"))
    }
}

/// Administrator storage with SQLite backend
pub struct AdminStore {
    conn: Mutex<Connection>,
}

impl AdminStore {
    /// Open (or create) the store and initialize its schema
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = db::open_with_schema(db_path, SCHEMA_SQL)
            .context("Failed to open admin store")?;

        // Pay for the dummy hash now, not on the first unknown-email login
        lazy_static::initialize(&DUMMY_HASH);
        if DUMMY_HASH.is_empty() {
            warn!("Dummy password hash unavailable; unknown-email logins will answer faster");
        }

        info!("🔐 Admin store initialized at: {}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new administrator. Fails with `DuplicateAdmin` if the email is taken.
    pub fn register(&self, email: &str, password: &str) -> Result<Admin, AdminStoreError> {
        let email = normalize_email(email);
        if self.find_by_email(&email)?.is_some() {
            return Err(AdminStoreError::DuplicateAdmin);
        }

        // Hash outside the lock
        let admin = Admin::new(&email, password)?;
        self.insert_admin(&admin)?;

        info!("✅ Created admin: {}", admin.email);
        Ok(admin)
    }

    /// Persist a freshly built admin. A taken email maps to `DuplicateAdmin`
    /// even when another writer got there after our existence check.
    fn insert_admin(&self, admin: &Admin) -> Result<(), AdminStoreError> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO admins (id, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                admin.id.to_string(),
                admin.email,
                admin.password_hash,
                admin.created_at.timestamp_millis(),
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(AdminStoreError::DuplicateAdmin)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check an email/password pair, returning the admin's identity on success.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub fn verify(&self, email: &str, password: &str) -> Result<AdminIdentity, AdminStoreError> {
        let email = normalize_email(email);
        match self.find_by_email(&email)? {
            Some(admin) if admin.check_password(password) => Ok(admin.identity()),
            Some(_) => {
                debug!("Password mismatch for admin {}", email);
                Err(AdminStoreError::InvalidCredentials)
            }
            None => {
                let _ = bcrypt::verify(password, DUMMY_HASH.as_str());
                debug!("No admin registered as {}", email);
                Err(AdminStoreError::InvalidCredentials)
            }
        }
    }

    /// Get admin by email
    pub fn find_by_email(&self, email: &str) -> Result<Option<Admin>, AdminStoreError> {
        let email = normalize_email(email);
        let conn = self.conn.lock();

        let admin = conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM admins WHERE email = ?1",
                params![email],
                row_to_admin,
            )
            .optional()?;

        Ok(admin)
    }

    /// Rotate an administrator's password (exactly one hash per call)
    pub fn change_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<Admin, AdminStoreError> {
        let mut admin = self
            .find_by_email(email)?
            .ok_or(AdminStoreError::AdminNotFound)?;

        admin.change_password(new_password)?;

        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE admins SET password_hash = ?1 WHERE id = ?2",
            params![admin.password_hash, admin.id.to_string()],
        )?;
        if updated == 0 {
            return Err(AdminStoreError::AdminNotFound);
        }

        info!("🔑 Password changed for admin: {}", admin.email);
        Ok(admin)
    }

    /// Number of registered administrators
    pub fn count(&self) -> Result<i64, AdminStoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_admin(row: &Row<'_>) -> rusqlite::Result<Admin> {
    let id: String = row.get(0)?;
    Ok(Admin {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: db::timestamp_column(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (AdminStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = AdminStore::open(db_path).unwrap();
        (store, temp_file)
    }

    #[test]
    fn test_register_and_find() {
        let (store, _temp) = create_test_store();

        let admin = store.register("admin@test.com", "secret123").unwrap();
        assert_eq!(admin.email, "admin@test.com");

        let found = store.find_by_email("admin@test.com").unwrap().unwrap();
        assert_eq!(found.id, admin.id);
        assert_eq!(found.password_hash, admin.password_hash);
        assert_ne!(found.password_hash, "secret123");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let (store, _temp) = create_test_store();

        store.register("admin@test.com", "secret123").unwrap();
        let second = store.register("admin@test.com", "other-password");
        assert!(matches!(second, Err(AdminStoreError::DuplicateAdmin)));

        // Case and whitespace don't make a new identity
        let shouted = store.register("  ADMIN@test.com", "other-password");
        assert!(matches!(shouted, Err(AdminStoreError::DuplicateAdmin)));

        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_maps_unique_violation_to_duplicate() {
        let (store, _temp) = create_test_store();

        // Two distinct admins with the same email skip the existence check
        let first = Admin::new("admin@test.com", "secret123").unwrap();
        let second = Admin::new("admin@test.com", "other-password").unwrap();

        store.insert_admin(&first).unwrap();
        let result = store.insert_admin(&second);
        assert!(matches!(result, Err(AdminStoreError::DuplicateAdmin)));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();

        let stores = [
            Arc::new(AdminStore::open(db_path).unwrap()),
            Arc::new(AdminStore::open(db_path).unwrap()),
        ];
        let barrier = Arc::new(Barrier::new(stores.len()));

        let handles: Vec<_> = stores
            .iter()
            .map(|store| {
                let store = Arc::clone(store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.register("admin@test.com", "secret123")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(AdminStoreError::DuplicateAdmin)))
            .count();

        assert_eq!(created, 1);
        assert_eq!(duplicates, 1);
        assert_eq!(stores[0].count().unwrap(), 1);
    }

    #[test]
    fn test_dummy_hash_ready_after_open() {
        let (_store, _temp) = create_test_store();
        assert!(bcrypt::verify("timing-equalizer", DUMMY_HASH.as_str()).unwrap());
    }

    #[test]
    fn test_password_verification() {
        let (store, _temp) = create_test_store();
        let admin = store.register("admin@test.com", "secret123").unwrap();

        // Correct password
        let identity = store.verify("admin@test.com", "secret123").unwrap();
        assert_eq!(identity, admin.identity());

        // Normalized email
        assert!(store.verify("Admin@Test.com ", "secret123").is_ok());

        // Incorrect password
        let wrong = store.verify("admin@test.com", "wrongpassword");
        assert!(matches!(wrong, Err(AdminStoreError::InvalidCredentials)));

        // Non-existent admin
        let unknown = store.verify("nobody@test.com", "secret123");
        assert!(matches!(unknown, Err(AdminStoreError::InvalidCredentials)));

        // Same message either way
        assert_eq!(wrong.unwrap_err().to_string(), unknown.unwrap_err().to_string());
    }

    #[test]
    fn test_change_password() {
        let (store, _temp) = create_test_store();
        store.register("admin@test.com", "old-password").unwrap();

        store.change_password("admin@test.com", "new-password").unwrap();

        assert!(store.verify("admin@test.com", "new-password").is_ok());
        assert!(matches!(
            store.verify("admin@test.com", "old-password"),
            Err(AdminStoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_change_password_unknown_admin() {
        let (store, _temp) = create_test_store();

        let result = store.change_password("nobody@test.com", "whatever");
        assert!(matches!(result, Err(AdminStoreError::AdminNotFound)));
    }

    #[test]
    fn test_store_reopens_existing_database() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();

        {
            let store = AdminStore::open(db_path).unwrap();
            store.register("admin@test.com", "secret123").unwrap();
        }

        let reopened = AdminStore::open(db_path).unwrap();
        assert!(reopened.verify("admin@test.com", "secret123").is_ok());
    }
}
