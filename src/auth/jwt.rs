//! JWT Token Handler
//! Mission: Issue and validate admin bearer tokens

use crate::auth::models::{AdminIdentity, Claims};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use tracing::debug;

/// Tokens are valid for 7 days from issuance
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Token errors
#[derive(Debug)]
pub enum TokenError {
    /// No signing secret configured
    NotConfigured,
    /// Bad signature or malformed structure
    Invalid,
    Expired,
    Signing(jsonwebtoken::errors::Error),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::NotConfigured => write!(f, "JWT signing secret is not configured"),
            TokenError::Invalid => write!(f, "Invalid token"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Signing(e) => write!(f, "Failed to sign token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key. An empty secret is a configuration error.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::NotConfigured);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        })
    }

    /// Seconds a freshly issued token stays valid
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a token for an admin, valid from now
    pub fn issue(&self, identity: &AdminIdentity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        identity: &AdminIdentity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expiration = now + self.ttl;

        let claims = Claims {
            sub: identity.id.to_string(),
            email: identity.email.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        debug!(
            "Generating JWT for admin {} ({}), expires at {}",
            identity.email, identity.id, expiration
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Validate a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Validate a token against an explicit clock.
    ///
    /// Expiry is checked here rather than by `jsonwebtoken` so that it has
    /// no leeway: a token is rejected from its `exp` second onwards.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let decoded = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Rejected JWT: {}", e);
            TokenError::Invalid
        })?;

        if decoded.claims.exp <= now.timestamp() {
            debug!("Rejected expired JWT for admin {}", decoded.claims.email);
            return Err(TokenError::Expired);
        }

        Ok(decoded.claims)
    }
}
