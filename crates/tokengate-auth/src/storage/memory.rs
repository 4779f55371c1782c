//! In-memory store implementations backed by `DashMap`.
//!
//! Suitable for a single process. Records are lost on restart, so a restart
//! forgets revocations; deployments that need durable logout plug in their
//! own [`RevocationStore`].

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::token::Claims;
use crate::types::UserIdentity;

use super::revocation::{RevocationStore, SessionMetadata, SessionRecord, SessionState};
use super::user::UserDirectory;

/// [`RevocationStore`] keeping one [`SessionRecord`] per `jti`.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    sessions: DashMap<String, SessionRecord>,
}

impl InMemoryRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn register_session(&self, jti: &str, metadata: SessionMetadata) -> AuthResult<()> {
        match self.sessions.entry(jti.to_string()) {
            Entry::Occupied(mut entry) => {
                // never resurrect a revoked jti
                entry.get_mut().metadata.get_or_insert(metadata);
            }
            Entry::Vacant(entry) => {
                entry.insert(SessionRecord {
                    jti: jti.to_string(),
                    retain_until: metadata.refresh_until.max(metadata.expires_at),
                    metadata: Some(metadata),
                    state: SessionState::Active,
                    revoked_at: None,
                });
            }
        }
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AuthResult<bool> {
        Ok(self
            .sessions
            .get(jti)
            .is_some_and(|record| record.is_revoked()))
    }

    async fn revoke(&self, jti: &str, until: i64) -> AuthResult<bool> {
        let now = OffsetDateTime::now_utc().unix_timestamp();

        match self.sessions.entry(jti.to_string()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.retain_until = record.retain_until.max(until);
                if record.is_revoked() {
                    return Ok(false);
                }
                record.state = SessionState::Revoked;
                record.revoked_at = Some(now);
                Ok(true)
            }
            Entry::Vacant(entry) => {
                entry.insert(SessionRecord {
                    jti: jti.to_string(),
                    metadata: None,
                    state: SessionState::Revoked,
                    revoked_at: Some(now),
                    retain_until: until,
                });
                Ok(true)
            }
        }
    }

    async fn session(&self, jti: &str) -> AuthResult<Option<SessionRecord>> {
        Ok(self.sessions.get(jti).map(|record| record.clone()))
    }

    async fn cleanup_expired(&self, now: i64) -> AuthResult<u64> {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|record| record.retain_until <= now)
            .map(|record| record.key().clone())
            .collect();

        let mut removed = 0;
        for jti in expired {
            if self
                .sessions
                .remove_if(&jti, |_, record| record.retain_until <= now)
                .is_some()
            {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired session records");
        }
        Ok(removed)
    }
}

/// [`UserDirectory`] over a fixed set of users keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, UserIdentity>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: UserIdentity) {
        self.users.insert(user.id.clone(), user);
    }
}

impl FromIterator<UserIdentity> for InMemoryUserDirectory {
    fn from_iter<I: IntoIterator<Item = UserIdentity>>(iter: I) -> Self {
        let directory = Self::new();
        for user in iter {
            directory.insert(user);
        }
        directory
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup(&self, principal: &str, _claims: &Claims) -> AuthResult<Option<UserIdentity>> {
        Ok(self.users.get(principal).map(|user| user.clone()))
    }
}
