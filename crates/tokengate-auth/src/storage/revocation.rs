//! Revocation and session store trait.
//!
//! Every issued token registers a session under its `jti`. Revoking a token
//! flips the session to [`SessionState::Revoked`] and keeps the record until
//! the token could no longer pass verification anyway, after which
//! [`RevocationStore::cleanup_expired`] may drop it.
//!
//! # Consistency
//!
//! A `revoke(jti)` that has returned must be observed by every later
//! `is_revoked(jti)` on the same store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// Metadata recorded when a token is issued. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Principal the token was issued for, if known.
    pub subject: Option<String>,

    /// `iat` of the token.
    pub issued_at: i64,

    /// `exp` of the token.
    pub expires_at: i64,

    /// End of the refresh window (`iat + refresh_ttl`).
    pub refresh_until: i64,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Issued and not revoked.
    Active,
    /// Revoked by logout or refresh.
    Revoked,
}

/// Record kept per `jti`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Token identifier.
    pub jti: String,

    /// Issuance metadata. Absent when a `jti` is revoked without having
    /// been registered through this store.
    pub metadata: Option<SessionMetadata>,

    /// Current state.
    pub state: SessionState,

    /// When the session was revoked (Unix seconds).
    pub revoked_at: Option<i64>,

    /// The record may be dropped once `now >= retain_until`.
    pub retain_until: i64,
}

impl SessionRecord {
    /// Returns `true` if the session has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.state == SessionState::Revoked
    }
}

/// Storage for session registration and `jti` revocation.
///
/// # Example Implementation
///
/// ```ignore
/// use tokengate_auth::storage::{RevocationStore, SessionMetadata, SessionRecord};
/// use tokengate_auth::AuthResult;
///
/// struct RedisRevocationStore { /* ... */ }
///
/// #[async_trait::async_trait]
/// impl RevocationStore for RedisRevocationStore {
///     async fn is_revoked(&self, jti: &str) -> AuthResult<bool> {
///         // EXISTS revoked:{jti}
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Records a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn register_session(&self, jti: &str, metadata: SessionMetadata) -> AuthResult<()>;

    /// Checks whether a `jti` has been revoked.
    ///
    /// Called on every verification that gets past the identity check.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_revoked(&self, jti: &str) -> AuthResult<bool>;

    /// Revokes a `jti`, keeping the record at least until `until`.
    ///
    /// Returns `true` if this call revoked the `jti` and `false` if it was
    /// already revoked. The check and the update must be atomic so that
    /// only one of two concurrent callers observes `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, jti: &str, until: i64) -> AuthResult<bool>;

    /// Looks up the session recorded for a `jti`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn session(&self, jti: &str) -> AuthResult<Option<SessionRecord>>;

    /// Drops every record whose retention has passed at `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self, now: i64) -> AuthResult<u64>;
}
