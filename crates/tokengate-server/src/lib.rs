//! HTTP service exposing login, refresh, logout and a protected identity
//! endpoint on top of `tokengate-auth`.

pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use credentials::{CredentialStore, hash_password};
pub use error::ApiError;
pub use handlers::{AppState, TokenResponse};
pub use server::{TokengateServer, build_app, spawn_cleanup};
