//! Authentication Models
//! Mission: Define administrator accounts, token claims and auth payloads

use bcrypt::{hash, verify, BcryptError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// bcrypt work factor for administrator passwords
pub const BCRYPT_COST: u32 = 10;

/// Administrator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub created_at: DateTime<Utc>,
}

impl Admin {
    /// Build a new administrator, hashing the plaintext password once.
    pub fn new(email: &str, password: &str) -> Result<Self, BcryptError> {
        Ok(Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: hash(password, BCRYPT_COST)?,
            created_at: Utc::now(),
        })
    }

    /// Replace the stored hash with a hash of `new_password`.
    ///
    /// This is the only way the hash changes after creation; the store
    /// persists whatever value is here and never hashes on save.
    pub fn change_password(&mut self, new_password: &str) -> Result<(), BcryptError> {
        self.password_hash = hash(new_password, BCRYPT_COST)?;
        Ok(())
    }

    /// Compare a plaintext password against the stored hash.
    pub fn check_password(&self, password: &str) -> bool {
        verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn identity(&self) -> AdminIdentity {
        AdminIdentity {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

/// What a token proves: which administrator holds it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub email: String,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // subject (admin id)
    pub email: String,
    pub iat: i64,
    pub exp: i64, // expiration timestamp (seconds)
}

/// Login / register request body
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    /// Check the body shape, returning a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !is_valid_email(&self.email) {
            return Err("Please enter a valid email");
        }
        if self.password.is_empty() {
            return Err("Password must not be empty");
        }
        Ok(())
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Generic `{message}` body used for confirmations and errors
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Current admin response (decoded from the token)
#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: String,
    pub email: String,
}

impl AdminResponse {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            email: claims.email.clone(),
        }
    }
}

/// Emails are compared trimmed and lowercased everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
