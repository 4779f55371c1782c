//! Token verification protocol.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. signature (unsigned tokens, algorithm mismatch, bad signature)
//! 2. `nbf`
//! 3. identity: `iss`, `aud`, and `jti` against the header copy
//! 4. revocation
//! 5. `exp`, then the refresh window for expired tokens
//!
//! Rejections are values ([`VerificationOutcome::Invalid`]); only store
//! failures are returned as errors.

use std::fmt;
use std::sync::Arc;

use crate::AuthResult;
use crate::config::{AuthConfig, ExpiryCodes};
use crate::error::AuthError;
use crate::storage::RevocationStore;

use super::claims::Claims;
use super::compact::Token;
use super::jwt::SignaturePrimitive;
use super::refresh::{ExpiryClass, RefreshPolicy};

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// The token could not be decoded.
    ParseFailure,
    /// No signature, or `alg = "none"`.
    Unsigned,
    /// Wrong algorithm or a signature that does not verify.
    SignatureMismatch,
    /// `now < nbf`.
    NotYetValid,
    /// `iss`, `aud` or `jti` is missing or does not match.
    MalformedIdentity,
    /// The `jti` has been revoked.
    Revoked,
    /// Expired, still inside the refresh window.
    ExpiredRefreshable,
    /// Expired, past the refresh window.
    ExpiredTerminal,
}

impl InvalidReason {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseFailure => "parse_failure",
            Self::Unsigned => "unsigned",
            Self::SignatureMismatch => "signature_mismatch",
            Self::NotYetValid => "not_yet_valid",
            Self::MalformedIdentity => "malformed_identity",
            Self::Revoked => "revoked",
            Self::ExpiredRefreshable => "expired_refreshable",
            Self::ExpiredTerminal => "expired_terminal",
        }
    }

    /// Converts the rejection into the matching [`AuthError`].
    #[must_use]
    pub fn into_error(self, codes: &ExpiryCodes) -> AuthError {
        match self {
            Self::ParseFailure => AuthError::parse_failure("token could not be decoded"),
            Self::Unsigned => AuthError::UnsignedToken,
            Self::SignatureMismatch => AuthError::SignatureMismatch,
            Self::NotYetValid => AuthError::NotYetValid,
            Self::MalformedIdentity => {
                AuthError::malformed_identity("issuer, audience or token id mismatch")
            }
            Self::Revoked => AuthError::Revoked,
            Self::ExpiredRefreshable => AuthError::ExpiredRefreshable {
                code: codes.refreshable,
            },
            Self::ExpiredTerminal => AuthError::ExpiredTerminal {
                code: codes.relogin,
            },
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ExpiryClass> for InvalidReason {
    fn from(class: ExpiryClass) -> Self {
        match class {
            ExpiryClass::Refreshable => Self::ExpiredRefreshable,
            ExpiryClass::Terminal => Self::ExpiredTerminal,
        }
    }
}

/// Result of verifying a token.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Every check passed.
    Valid(Claims),
    /// A check failed.
    Invalid(InvalidReason),
}

impl VerificationOutcome {
    /// Returns `true` for [`VerificationOutcome::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The rejection reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }

    /// Turns the outcome into claims or the matching error.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] for the rejection reason.
    pub fn into_result(self, codes: &ExpiryCodes) -> AuthResult<Claims> {
        match self {
            Self::Valid(claims) => Ok(claims),
            Self::Invalid(reason) => Err(reason.into_error(codes)),
        }
    }
}

/// Runs the ordered trust checks against a parsed token.
#[derive(Clone)]
pub struct TokenVerifier {
    primitive: Arc<dyn SignaturePrimitive>,
    revocations: Arc<dyn RevocationStore>,
    policy: RefreshPolicy,
    issuer: String,
    audience: String,
    leeway: i64,
}

impl TokenVerifier {
    /// Creates a verifier for the configured issuer, audience and leeway.
    pub fn new(
        config: &AuthConfig,
        primitive: Arc<dyn SignaturePrimitive>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            primitive,
            revocations,
            policy: RefreshPolicy::from_config(config),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            leeway: config.leeway_secs(),
        }
    }

    /// The refresh policy applied to expired tokens.
    #[must_use]
    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Verifies the token at `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the revocation store fails.
    pub async fn verify(&self, token: &Token, now: i64) -> AuthResult<VerificationOutcome> {
        let claims = token.claims();

        if !token.is_signed() {
            return Ok(reject(claims, InvalidReason::Unsigned));
        }

        if token.header().alg != self.primitive.algorithm().as_str() {
            tracing::debug!(
                jti = %claims.jti,
                alg = %token.header().alg,
                expected = %self.primitive.algorithm(),
                "Token algorithm does not match the configured algorithm"
            );
            return Ok(reject(claims, InvalidReason::SignatureMismatch));
        }

        match self
            .primitive
            .verify(token.signing_input().as_bytes(), token.signature())
            .await
        {
            Ok(true) => {}
            Ok(false) => return Ok(reject(claims, InvalidReason::SignatureMismatch)),
            Err(e) => {
                tracing::debug!(jti = %claims.jti, error = %e, "Signature could not be evaluated");
                return Ok(reject(claims, InvalidReason::SignatureMismatch));
            }
        }

        if now.saturating_add(self.leeway) < claims.nbf {
            return Ok(reject(claims, InvalidReason::NotYetValid));
        }

        if !self.identity_matches(token) {
            return Ok(reject(claims, InvalidReason::MalformedIdentity));
        }

        if self.revocations.is_revoked(&claims.jti).await? {
            return Ok(reject(claims, InvalidReason::Revoked));
        }

        if now <= claims.exp.saturating_add(self.leeway) {
            return Ok(VerificationOutcome::Valid(claims.clone()));
        }

        let reason = self.policy.classify_expired(claims, now).into();
        Ok(reject(claims, reason))
    }

    fn identity_matches(&self, token: &Token) -> bool {
        let claims = token.claims();
        claims.iss == self.issuer
            && claims.aud == self.audience
            && !claims.jti.is_empty()
            && token.header().jti.as_deref() == Some(claims.jti.as_str())
    }
}

fn reject(claims: &Claims, reason: InvalidReason) -> VerificationOutcome {
    tracing::debug!(jti = %claims.jti, reason = %reason, "Token rejected");
    VerificationOutcome::Invalid(reason)
}
