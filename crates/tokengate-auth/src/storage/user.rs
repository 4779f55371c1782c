//! Principal lookup trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::token::Claims;
use crate::types::UserIdentity;

/// Resolves the principal named by verified claims.
///
/// Called by the session gate only after a token verified as valid and only
/// when the configured principal claim is present.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up the user identified by `principal`, the value of the
    /// configured binding claim. The full claim set is passed along for
    /// directories that key on more than one claim.
    ///
    /// Returns `Ok(None)` if no such user exists; the request then proceeds
    /// as verified but unbound.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be queried.
    async fn lookup(&self, principal: &str, claims: &Claims) -> AuthResult<Option<UserIdentity>>;
}
