//! Compact token representation: `base64url(header).base64url(claims).signature`.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::AuthResult;
use crate::error::AuthError;

use super::claims::Claims;

/// Largest raw token accepted by the parser, in bytes.
pub const MAX_TOKEN_LEN: usize = 8 * 1024;

/// Token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Algorithm name (e.g. "HS256").
    pub alg: String,

    /// Token type, always "JWT" for issued tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Copy of the `jti` claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenHeader {
    /// Header for a freshly issued token.
    #[must_use]
    pub fn new(alg: impl Into<String>, jti: impl Into<String>) -> Self {
        Self {
            alg: alg.into(),
            typ: Some("JWT".to_string()),
            jti: Some(jti.into()),
        }
    }
}

/// An encoded token together with its decoded header and claims.
///
/// Immutable once constructed. Only the signer and the parser build tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    header: TokenHeader,
    claims: Claims,
    encoded: String,
    // byte offset of the dot before the signature segment
    signature_dot: usize,
}

impl Token {
    pub(crate) fn new(header: TokenHeader, claims: Claims, encoded: String) -> AuthResult<Self> {
        let signature_dot = encoded
            .rfind('.')
            .ok_or_else(|| AuthError::parse_failure("missing signature segment"))?;
        Ok(Self {
            header,
            claims,
            encoded,
            signature_dot,
        })
    }

    /// Decoded header.
    #[must_use]
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Decoded claims.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Consumes the token and returns its claims.
    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.claims
    }

    /// Token identifier.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// The compact encoded form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// The `header.claims` part covered by the signature.
    #[must_use]
    pub fn signing_input(&self) -> &str {
        &self.encoded[..self.signature_dot]
    }

    /// The base64url signature segment, possibly empty.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.encoded[self.signature_dot + 1..]
    }

    /// Returns `false` for tokens with an empty signature or `alg = "none"`.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !self.signature().is_empty() && !self.header.alg.eq_ignore_ascii_case("none")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Serializes a value to JSON and encodes it as a base64url segment.
pub(crate) fn encode_segment<T: Serialize>(value: &T) -> AuthResult<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AuthError::internal(format!("Failed to serialize token segment: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a base64url segment that must hold a JSON object.
pub(crate) fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> AuthResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::parse_failure(format!("{what} is not base64url: {e}")))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::parse_failure(format!("{what} is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(AuthError::parse_failure(format!(
            "{what} is not a JSON object"
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| AuthError::parse_failure(format!("invalid {what}: {e}")))
}
