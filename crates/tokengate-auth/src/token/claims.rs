//! Token claims and the builder that assembles them at issuance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::config::AuthConfig;

/// Caller-supplied claims merged into a token next to the standard claims.
pub type CustomClaims = Map<String, Value>;

/// Names of the claims set by the builder. Custom claims never override them.
pub const STANDARD_CLAIMS: [&str; 6] = ["iss", "aud", "jti", "iat", "nbf", "exp"];

/// Returns `true` if `name` is one of the standard claim names.
#[must_use]
pub fn is_standard_claim(name: &str) -> bool {
    STANDARD_CLAIMS.contains(&name)
}

/// The claim set carried by a token.
///
/// `iat`, `nbf` and `exp` are required to decode a token at all. `iss`, `aud`
/// and `jti` decode to an empty string when absent so that their absence is
/// reported by the identity check rather than as a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Issuer.
    #[serde(default)]
    pub iss: String,

    /// Audience.
    #[serde(default)]
    pub aud: String,

    /// Token identifier, the revocation/session key.
    #[serde(default)]
    pub jti: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Not before (Unix timestamp).
    pub nbf: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Custom claims.
    #[serde(flatten)]
    pub custom: CustomClaims,
}

impl Claims {
    /// Creates a new builder seeded from the configuration.
    #[must_use]
    pub fn builder(config: &AuthConfig) -> ClaimsBuilder {
        ClaimsBuilder::new(config)
    }

    /// Gets a custom claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }

    /// Returns the principal identifier stored under `claim`.
    ///
    /// Strings are returned as-is and numbers are rendered; any other JSON
    /// type (or an empty string) does not identify a principal.
    #[must_use]
    pub fn principal(&self, claim: &str) -> Option<String> {
        match self.custom.get(claim)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns `true` if `now` is past `exp`.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}

/// Builder for [`Claims`].
///
/// Generates a fresh UUID v4 `jti` and stamps `iat = now`,
/// `nbf = now + not_before` and `exp = now + ttl`.
pub struct ClaimsBuilder {
    iss: String,
    aud: String,
    jti: String,
    iat: i64,
    ttl: i64,
    not_before: i64,
    custom: CustomClaims,
}

impl ClaimsBuilder {
    fn new(config: &AuthConfig) -> Self {
        Self {
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            ttl: config.ttl_secs(),
            not_before: config.not_before_secs(),
            custom: CustomClaims::new(),
        }
    }

    /// Overrides the issuance time (Unix timestamp).
    #[must_use]
    pub fn issued_at(mut self, iat: i64) -> Self {
        self.iat = iat;
        self
    }

    /// Adds one custom claim. Standard claim names are ignored.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if is_standard_claim(&name) {
            tracing::debug!(claim = %name, "Ignoring custom claim that collides with a standard claim");
        } else {
            self.custom.insert(name, value.into());
        }
        self
    }

    /// Adds all custom claims. Standard claim names are ignored.
    #[must_use]
    pub fn claims(self, claims: CustomClaims) -> Self {
        claims
            .into_iter()
            .fold(self, |builder, (name, value)| builder.claim(name, value))
    }

    /// Builds the claim set.
    #[must_use]
    pub fn build(self) -> Claims {
        Claims {
            iss: self.iss,
            aud: self.aud,
            jti: self.jti,
            iat: self.iat,
            nbf: self.iat.saturating_add(self.not_before),
            exp: self.iat.saturating_add(self.ttl),
            custom: self.custom,
        }
    }
}
