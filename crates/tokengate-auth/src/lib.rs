//! # tokengate-auth
//!
//! Signed bearer token lifecycle for HTTP services.
//!
//! This crate provides:
//! - Token issuance with standard and custom claims
//! - Ordered verification: signature, `nbf`, identity, revocation, expiry
//! - A two-tier expiry policy with a refresh window anchored on `iat`
//! - Explicit logout by `jti` revocation
//! - axum extractors and middleware that bind an identity to each request
//!
//! ## Modules
//!
//! - [`config`] - Token lifecycle configuration
//! - [`token`] - Claims, signing, parsing, verification and the token service
//! - [`storage`] - Revocation store and user directory traits
//! - [`middleware`] - Session gate for axum
//! - [`types`] - Per-request identity types

pub mod config;
pub mod error;
pub mod middleware;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError, ExpiryCodes, TokenTransport};
pub use error::{AuthError, ErrorCategory};
pub use middleware::{
    Authenticated, OptionalAuthenticated, RequestTokenSource, SessionGate, TokenSource,
    require_session,
};
pub use storage::{
    InMemoryRevocationStore, InMemoryUserDirectory, RevocationStore, SessionMetadata,
    SessionRecord, SessionState, UserDirectory,
};
pub use token::{
    Claims, ClaimsBuilder, CustomClaims, InvalidReason, RefreshPolicy, SignaturePrimitive,
    SigningAlgorithm, Token, TokenParser, TokenService, VerificationOutcome,
};
pub use types::{AuthenticatedIdentity, UserIdentity};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokengate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::middleware::{
        Authenticated, OptionalAuthenticated, SessionGate, require_session,
    };
    pub use crate::storage::{RevocationStore, UserDirectory};
    pub use crate::token::{Claims, CustomClaims, Token, TokenService, VerificationOutcome};
    pub use crate::types::{AuthenticatedIdentity, UserIdentity};
}
