//! Runtime configuration
//!
//! Every setting is a command-line flag that falls back to an environment
//! variable (`.env` is loaded before parsing). The resulting values are
//! passed explicitly into the stores and the token handler at startup.

use anyhow::{bail, Result};
use clap::{Args, Parser};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Where the SQLite database lives
#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database holding admins, users and chats
    #[arg(long = "database-path", env = "DATABASE_PATH")]
    pub path: String,
}

/// Server configuration
#[derive(Parser, Debug, Clone)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Secret used to sign admin JWTs
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Interface to bind
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
}

impl Config {
    /// Build a config directly (tests, embedding)
    pub fn new(database_path: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                path: database_path.into(),
            },
            jwt_secret: jwt_secret.into(),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
        }
    }

    /// Reject values clap accepts but the server can't run with
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            bail!("DATABASE_PATH must not be empty");
        }
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_flags() {
        let config = Config::try_parse_from([
            "chatadmin",
            "--database-path",
            "/tmp/admin.db",
            "--jwt-secret",
            "s3cret",
            "--port",
            "8080",
        ])
        .unwrap();

        assert_eq!(config.database.path, "/tmp/admin.db");
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.listen_addr(), "0.0.0.0:8080".parse().unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_fails_validation() {
        let config = Config::new("/tmp/admin.db", "  ");
        assert!(config.validate().is_err());

        let config = Config::new("", "s3cret");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::new("/tmp/admin.db", "s3cret");
        assert_eq!(config.port, 5000);
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:5000");
    }
}
