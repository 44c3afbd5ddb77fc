//! Authentication Module
//! Mission: Secure the admin API with hashed credentials and JWT bearer tokens

pub mod admin_store;
pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use admin_store::{AdminStore, AdminStoreError};
pub use api::AuthState;
pub use jwt::{JwtHandler, TokenError};
pub use middleware::{auth_middleware, AuthenticatedAdmin};
