//! Token lifecycle service.
//!
//! Ties claims construction, signing, verification and the revocation store
//! together into the four session operations: issue, authenticate, refresh
//! and logout.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokengate_auth::{AuthConfig, TokenService, storage::InMemoryRevocationStore};
//!
//! let service = TokenService::from_config(config, Arc::new(InMemoryRevocationStore::new()))?;
//!
//! let token = service.issue(custom_claims).await?;
//! let claims = service.authenticate(token.as_str()).await?;
//! ```

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{RevocationStore, SessionMetadata};

use super::claims::{Claims, CustomClaims};
use super::compact::Token;
use super::jwt::{JwtPrimitive, SignaturePrimitive, SigningKeyPair};
use super::parser::TokenParser;
use super::refresh::RefreshPolicy;
use super::signer::TokenSigner;
use super::verifier::{InvalidReason, TokenVerifier, VerificationOutcome};

/// Session manager for signed bearer tokens.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct TokenService {
    config: AuthConfig,
    signer: TokenSigner,
    verifier: TokenVerifier,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenService {
    /// Creates a service from its parts.
    pub fn new(
        config: AuthConfig,
        primitive: Arc<dyn SignaturePrimitive>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let verifier = TokenVerifier::new(&config, primitive.clone(), revocations.clone());
        Self {
            config,
            signer: TokenSigner::new(primitive),
            verifier,
            revocations,
        }
    }

    /// Validates the configuration and builds the signing key it describes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration or the key
    /// material is invalid.
    pub fn from_config(
        config: AuthConfig,
        revocations: Arc<dyn RevocationStore>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let key = SigningKeyPair::from_config(&config.signing)?;
        tracing::info!(
            algorithm = %key.algorithm,
            issuer = %config.issuer,
            ttl_secs = config.ttl_secs(),
            refresh_ttl_secs = config.refresh_ttl_secs(),
            "Token service initialized"
        );
        Ok(Self::new(config, Arc::new(JwtPrimitive::new(key)), revocations))
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The refresh policy.
    #[must_use]
    pub fn refresh_policy(&self) -> &RefreshPolicy {
        self.verifier.policy()
    }

    /// The revocation store.
    #[must_use]
    pub fn revocations(&self) -> &Arc<dyn RevocationStore> {
        &self.revocations
    }

    /// Issues a token carrying the given custom claims.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or session registration fails.
    pub async fn issue(&self, custom: CustomClaims) -> AuthResult<Token> {
        self.issue_at(custom, now()).await
    }

    /// Issues a token as of `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns an error if signing or session registration fails.
    pub async fn issue_at(&self, custom: CustomClaims, now: i64) -> AuthResult<Token> {
        let claims = Claims::builder(&self.config)
            .issued_at(now)
            .claims(custom)
            .build();

        let metadata = SessionMetadata {
            subject: claims.principal(&self.config.user_binding.claim),
            issued_at: claims.iat,
            expires_at: claims.exp,
            refresh_until: self.refresh_policy().refresh_deadline(&claims),
        };

        let token = self.signer.sign(claims).await?;
        self.revocations
            .register_session(token.jti(), metadata)
            .await?;

        tracing::info!(jti = %token.jti(), exp = token.claims().exp, "Token issued");
        Ok(token)
    }

    /// Parses a raw token without verifying it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ParseFailure` if the token is malformed.
    pub fn parse(&self, raw: &str) -> AuthResult<Token> {
        TokenParser::parse(raw)
    }

    /// Runs the verification protocol at `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the revocation store fails.
    pub async fn verify(&self, token: &Token, now: i64) -> AuthResult<VerificationOutcome> {
        self.verifier.verify(token, now).await
    }

    /// Parses and verifies a raw token, returning its claims if valid.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] matching the parse failure or rejection.
    pub async fn authenticate(&self, raw: &str) -> AuthResult<Claims> {
        self.authenticate_at(raw, now()).await
    }

    /// [`authenticate`](Self::authenticate) as of `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] matching the parse failure or rejection.
    pub async fn authenticate_at(&self, raw: &str, now: i64) -> AuthResult<Claims> {
        let token = self.parse(raw)?;
        self.verify(&token, now)
            .await?
            .into_result(&self.config.codes)
    }

    /// Exchanges an expired token inside its refresh window for a new one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshNotAllowed` for a still-valid token or one
    /// past its refresh window, and the matching rejection otherwise.
    pub async fn refresh(&self, token: &Token) -> AuthResult<Token> {
        self.refresh_at(token, now()).await
    }

    /// [`refresh`](Self::refresh) as of `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshNotAllowed` for a still-valid token or one
    /// past its refresh window, and the matching rejection otherwise.
    pub async fn refresh_at(&self, token: &Token, now: i64) -> AuthResult<Token> {
        match self.verify(token, now).await? {
            VerificationOutcome::Invalid(InvalidReason::ExpiredRefreshable) => {}
            VerificationOutcome::Valid(_) => {
                return Err(AuthError::refresh_not_allowed("token has not expired"));
            }
            VerificationOutcome::Invalid(InvalidReason::ExpiredTerminal) => {
                return Err(AuthError::refresh_not_allowed(
                    "refresh window has passed",
                ));
            }
            VerificationOutcome::Invalid(reason) => {
                return Err(reason.into_error(&self.config.codes));
            }
        }

        let claims = token.claims();
        if !self
            .revocations
            .revoke(&claims.jti, self.retain_until(claims))
            .await?
        {
            // a concurrent refresh or logout got there first
            tracing::debug!(jti = %claims.jti, "Refresh lost a race with another revocation");
            return Err(AuthError::Revoked);
        }

        let refreshed = self.issue_at(claims.custom.clone(), now).await?;
        tracing::info!(
            old_jti = %claims.jti,
            new_jti = %refreshed.jti(),
            "Token refreshed"
        );
        Ok(refreshed)
    }

    /// Revokes the token's `jti` so it is rejected from now on.
    ///
    /// Accepted for valid tokens and for expired tokens still inside their
    /// refresh window.
    ///
    /// # Errors
    ///
    /// Returns the matching rejection for any other verification outcome.
    pub async fn logout(&self, token: &Token) -> AuthResult<()> {
        self.logout_at(token, now()).await
    }

    /// [`logout`](Self::logout) as of `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// Returns the matching rejection for any other verification outcome.
    pub async fn logout_at(&self, token: &Token, now: i64) -> AuthResult<()> {
        match self.verify(token, now).await? {
            VerificationOutcome::Valid(_)
            | VerificationOutcome::Invalid(InvalidReason::ExpiredRefreshable) => {}
            VerificationOutcome::Invalid(reason) => {
                return Err(reason.into_error(&self.config.codes));
            }
        }

        let claims = token.claims();
        self.revocations
            .revoke(&claims.jti, self.retain_until(claims))
            .await?;
        tracing::info!(jti = %claims.jti, "Token revoked by logout");
        Ok(())
    }

    /// Drops session records whose retention has passed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cleanup fails.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.revocations.cleanup_expired(now()).await
    }

    // A revoked jti must stay revoked for as long as the token could still
    // verify or refresh.
    fn retain_until(&self, claims: &Claims) -> i64 {
        claims
            .exp
            .saturating_add(self.config.leeway_secs())
            .max(self.refresh_policy().refresh_deadline(claims))
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
