//! Token lifecycle configuration.
//!
//! A single immutable [`AuthConfig`] is read once at startup and handed to
//! every component at construction time.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::token::claims::is_standard_claim;
use crate::token::jwt::SigningAlgorithm;

/// Minimum HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Root token configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://auth.example.com"
/// audience = "https://api.example.com"
/// ttl = "1h"
/// refresh_ttl = "1day"
///
/// [auth.signing]
/// algorithm = "HS256"
/// secret = "change-me-to-at-least-32-bytes!!"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim and the issuer every token must match.
    pub issuer: String,

    /// Value of the `aud` claim and the audience every token must match.
    pub audience: String,

    /// Token lifetime, measured from issuance (`exp = iat + ttl`).
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Offset before the token becomes usable (`nbf = iat + not_before`).
    #[serde(with = "humantime_serde")]
    pub not_before: Duration,

    /// Refresh window, measured from `iat` (not from `exp`).
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Duration,

    /// Clock skew tolerance for the `nbf` and `exp` checks.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Signing algorithm and key material.
    pub signing: SigningConfig,

    /// Where the token is read from on inbound requests.
    pub transport: TransportConfig,

    /// Principal binding after successful verification.
    pub user_binding: UserBindingConfig,

    /// Numeric codes reported for the two expiry outcomes.
    pub codes: ExpiryCodes,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "tokengate".to_string(),
            audience: "tokengate-clients".to_string(),
            ttl: Duration::from_secs(3600),         // 1 hour
            not_before: Duration::ZERO,
            refresh_ttl: Duration::from_secs(7200), // 2 hours
            leeway: Duration::ZERO,
            signing: SigningConfig::default(),
            transport: TransportConfig::default(),
            user_binding: UserBindingConfig::default(),
            codes: ExpiryCodes::default(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm.
    /// Supported: "HS256", "HS384", "HS512", "RS256", "RS384", "ES384"
    pub algorithm: String,

    /// Shared secret for HMAC algorithms.
    /// When absent an ephemeral secret is generated at startup.
    pub secret: Option<String>,

    /// PEM-encoded private key for RSA/EC algorithms.
    pub private_key_pem: Option<String>,

    /// PEM-encoded public key for RSA/EC algorithms.
    pub public_key_pem: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: None,
            private_key_pem: None,
            public_key_pem: None,
        }
    }
}

impl SigningConfig {
    /// Parses the configured algorithm name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unsupported names.
    pub fn algorithm(&self) -> Result<SigningAlgorithm, ConfigError> {
        SigningAlgorithm::from_str(&self.algorithm).map_err(|_| {
            ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be one of HS256, HS384, HS512, RS256, RS384, ES384",
                self.algorithm
            ))
        })
    }
}

/// Transport the token is carried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenTransport {
    /// `Authorization: Bearer <token>`.
    Header,
    /// `?<name>=<token>` query parameter.
    Query,
    /// `Cookie: <name>=<token>`.
    Cookie,
}

impl TokenTransport {
    /// Returns the transport name as used in configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Cookie => "cookie",
        }
    }
}

/// Token transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Where to look for the token.
    pub kind: TokenTransport,

    /// Query parameter or cookie name. Ignored for the header transport.
    pub name: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TokenTransport::Header,
            name: "token".to_string(),
        }
    }
}

/// Principal binding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserBindingConfig {
    /// Resolve a user from verified claims.
    pub enabled: bool,

    /// Custom claim holding the principal identifier.
    pub claim: String,
}

impl Default for UserBindingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            claim: "uid".to_string(),
        }
    }
}

/// Numeric codes for the expiry outcomes.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExpiryCodes {
    /// Code reported when the token can still be refreshed.
    pub refreshable: u32,

    /// Code reported when the caller must log in again.
    pub relogin: u32,
}

impl Default for ExpiryCodes {
    fn default() -> Self {
        Self {
            refreshable: 50001,
            relogin: 50002,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::configuration(err.to_string())
    }
}

impl AuthConfig {
    /// Token lifetime in whole seconds.
    #[must_use]
    pub fn ttl_secs(&self) -> i64 {
        secs(self.ttl)
    }

    /// Not-before offset in whole seconds.
    #[must_use]
    pub fn not_before_secs(&self) -> i64 {
        secs(self.not_before)
    }

    /// Refresh window in whole seconds.
    #[must_use]
    pub fn refresh_ttl_secs(&self) -> i64 {
        secs(self.refresh_ttl)
    }

    /// Clock skew tolerance in whole seconds.
    #[must_use]
    pub fn leeway_secs(&self) -> i64 {
        secs(self.leeway)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - issuer or audience is empty
    /// - `ttl` is zero or not greater than `not_before`
    /// - `refresh_ttl` is shorter than `ttl`
    /// - the signing algorithm is unsupported or its key material is inconsistent
    /// - the transport or user-binding names are empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.audience.is_empty() {
            return Err(ConfigError::InvalidValue(
                "audience cannot be empty".to_string(),
            ));
        }

        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidValue("ttl must be > 0".to_string()));
        }

        // exp = iat + ttl must stay after nbf = iat + not_before
        if self.ttl_secs() <= self.not_before_secs() {
            return Err(ConfigError::InvalidValue(
                "ttl must be greater than not_before".to_string(),
            ));
        }

        if self.refresh_ttl < self.ttl {
            return Err(ConfigError::InvalidValue(
                "refresh_ttl must be >= ttl".to_string(),
            ));
        }

        let algorithm = self.signing.algorithm()?;
        if algorithm.is_hmac() {
            if let Some(secret) = &self.signing.secret
                && secret.len() < MIN_SECRET_LEN
            {
                return Err(ConfigError::InvalidValue(format!(
                    "signing secret must be at least {} bytes",
                    MIN_SECRET_LEN
                )));
            }
        } else {
            match (
                &self.signing.private_key_pem,
                &self.signing.public_key_pem,
            ) {
                (Some(_), None) => {
                    return Err(ConfigError::Missing("signing.public_key_pem".to_string()));
                }
                (None, Some(_)) => {
                    return Err(ConfigError::Missing(
                        "signing.private_key_pem".to_string(),
                    ));
                }
                _ => {}
            }
        }

        if self.transport.kind != TokenTransport::Header && self.transport.name.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "transport name cannot be empty for the {} transport",
                self.transport.kind.as_str()
            )));
        }

        if self.user_binding.enabled && self.user_binding.claim.is_empty() {
            return Err(ConfigError::InvalidValue(
                "user_binding.claim cannot be empty".to_string(),
            ));
        }

        if self.user_binding.enabled && is_standard_claim(&self.user_binding.claim) {
            return Err(ConfigError::InvalidValue(format!(
                "user_binding.claim cannot be the standard claim '{}'",
                self.user_binding.claim
            )));
        }

        Ok(())
    }
}

fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}
