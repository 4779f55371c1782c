//! Request identity types.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::token::Claims;

/// A user resolved through a [`UserDirectory`](crate::storage::UserDirectory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Unique identifier, matched against the principal claim.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Assigned roles.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Additional attributes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl UserIdentity {
    /// Creates a user with no roles or attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: None,
            roles: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Returns `true` if the user has a specific role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// The identity established for one request.
///
/// Built by the session gate after a token verified as valid, handed to
/// handlers through an extractor or request extensions, and dropped with
/// the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    /// Verified claims (wrapped in Arc for cheap cloning).
    pub claims: Arc<Claims>,

    /// Resolved user, if binding is enabled and the user was found.
    pub user: Option<UserIdentity>,
}

impl AuthenticatedIdentity {
    /// Creates an identity from verified claims.
    #[must_use]
    pub fn new(claims: Claims, user: Option<UserIdentity>) -> Self {
        Self {
            claims: Arc::new(claims),
            user,
        }
    }

    /// Token identifier of the session.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// Returns `true` if a user was bound to the request.
    #[must_use]
    pub fn is_user_bound(&self) -> bool {
        self.user.is_some()
    }

    /// Gets a custom claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.claims.get(name)
    }
}
