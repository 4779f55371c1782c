//! Structural token decoding.
//!
//! Parsing never checks signatures, timing or identity. It only turns a raw
//! string into a [`Token`] or a `ParseFailure`, never a partial token.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::AuthResult;
use crate::error::AuthError;

use super::claims::Claims;
use super::compact::{MAX_TOKEN_LEN, Token, TokenHeader, decode_segment};

/// Decodes compact tokens.
pub struct TokenParser;

impl TokenParser {
    /// Parses a raw compact token.
    ///
    /// An empty signature segment or `alg = "none"` is accepted here; the
    /// resulting token reports `is_signed() == false` and is rejected later
    /// by the verifier.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ParseFailure` if the input is oversized, does not
    /// have exactly three segments, or a segment does not decode.
    pub fn parse(raw: &str) -> AuthResult<Token> {
        if raw.is_empty() {
            return Err(AuthError::parse_failure("token is empty"));
        }
        if raw.len() > MAX_TOKEN_LEN {
            return Err(AuthError::parse_failure(format!(
                "token exceeds {MAX_TOKEN_LEN} bytes"
            )));
        }

        let segments: Vec<&str> = raw.split('.').collect();
        let [header_segment, claims_segment, signature_segment] = segments.as_slice() else {
            return Err(AuthError::parse_failure(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        if header_segment.is_empty() || claims_segment.is_empty() {
            return Err(AuthError::parse_failure("empty header or claims segment"));
        }

        let header: TokenHeader = decode_segment(header_segment, "header")?;
        let claims: Claims = decode_segment(claims_segment, "claims")?;

        if !signature_segment.is_empty() && URL_SAFE_NO_PAD.decode(signature_segment).is_err() {
            return Err(AuthError::parse_failure("signature is not base64url"));
        }

        Token::new(header, claims, raw.to_string())
    }
}
