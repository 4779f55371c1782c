//! Username/password accounts backing the login endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tokengate_auth::{InMemoryUserDirectory, UserIdentity};

use crate::config::UserRecord;

/// Hashes a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
struct Account {
    password_hash: String,
    identity: UserIdentity,
}

/// Accounts keyed by username.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    accounts: Arc<HashMap<String, Account>>,
}

impl CredentialStore {
    pub fn from_records(records: &[UserRecord]) -> Self {
        let accounts = records
            .iter()
            .map(|record| {
                (
                    record.username.clone(),
                    Account {
                        password_hash: record.password_hash.clone(),
                        identity: record.identity(),
                    },
                )
            })
            .collect();
        Self {
            accounts: Arc::new(accounts),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Checks a username/password pair and returns the account identity.
    ///
    /// Argon2 runs on the blocking pool. Unknown usernames and wrong
    /// passwords are indistinguishable to the caller.
    pub async fn verify(&self, username: &str, password: &str) -> Option<UserIdentity> {
        let account = self.accounts.get(username)?.clone();
        let password = password.to_owned();

        let hash = account.password_hash;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "password verification task failed");
                false
            });

        matches.then_some(account.identity)
    }

    /// Directory used to bind verified tokens back to accounts by user id.
    pub fn directory(&self) -> InMemoryUserDirectory {
        self.accounts
            .values()
            .map(|account| account.identity.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, username: &str, password: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            username: username.to_string(),
            password_hash: hash_password(password).unwrap(),
            name: Some("Alice".to_string()),
            roles: vec!["admin".to_string()],
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_store_verify() {
        let store = CredentialStore::from_records(&[record("u1", "alice", "pw")]);
        assert_eq!(store.len(), 1);

        let identity = store.verify("alice", "pw").await.unwrap();
        assert_eq!(identity.id, "u1");
        assert_eq!(identity.name.as_deref(), Some("Alice"));

        assert!(store.verify("alice", "nope").await.is_none());
        assert!(store.verify("bob", "pw").await.is_none());
    }

    #[tokio::test]
    async fn test_directory_keyed_by_id() {
        use tokengate_auth::{Claims, UserDirectory};

        let store = CredentialStore::from_records(&[record("u1", "alice", "pw")]);
        let directory = store.directory();

        let claims: Claims = serde_json::from_value(serde_json::json!({
            "iss": "i", "aud": "a", "jti": "j", "iat": 0, "nbf": 0, "exp": 1
        }))
        .unwrap();
        let user = directory.lookup("u1", &claims).await.unwrap();
        assert_eq!(user.unwrap().username, "alice");
    }
}
