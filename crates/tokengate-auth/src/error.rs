//! Authentication error types.
//!
//! Every failure the token lifecycle can surface is a variant of [`AuthError`].
//! None of them are retried internally; each one is terminal for the current
//! request and is translated into a rejection at the HTTP boundary.

use std::fmt;

/// Errors that can occur while issuing, verifying, refreshing or revoking tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The raw token could not be decoded into header and claims.
    #[error("Malformed token: {message}")]
    ParseFailure {
        /// Description of the decoding failure.
        message: String,
    },

    /// The signature does not match the configured key and algorithm.
    #[error("Token signature mismatch")]
    SignatureMismatch,

    /// The token carries no signature at all.
    #[error("Token is not signed")]
    UnsignedToken,

    /// The token's `nbf` lies in the future.
    #[error("Token is not yet valid")]
    NotYetValid,

    /// `iss`, `aud` or `jti` is missing or does not match.
    #[error("Token identity check failed: {message}")]
    MalformedIdentity {
        /// Which identity claim failed.
        message: String,
    },

    /// The token's `jti` is present in the revocation store.
    #[error("Token has been revoked")]
    Revoked,

    /// The token expired but can still be exchanged via refresh.
    #[error("Token has expired, refresh it")]
    ExpiredRefreshable {
        /// Configured machine-readable code for this outcome.
        code: u32,
    },

    /// The token expired past its refresh window; a new login is required.
    #[error("Token refresh window has passed, log in again")]
    ExpiredTerminal {
        /// Configured machine-readable code for this outcome.
        code: u32,
    },

    /// No token was found on the request.
    #[error("Missing credential: {message}")]
    MissingCredential {
        /// Where the token was expected.
        message: String,
    },

    /// Refresh was requested for a token that is not in its refresh window.
    #[error("Refresh not allowed: {message}")]
    RefreshNotAllowed {
        /// Why the token cannot be refreshed.
        message: String,
    },

    /// The revocation/session store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `ParseFailure` error.
    #[must_use]
    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::ParseFailure {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedIdentity` error.
    #[must_use]
    pub fn malformed_identity(message: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            message: message.into(),
        }
    }

    /// Creates a new `MissingCredential` error.
    #[must_use]
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential {
            message: message.into(),
        }
    }

    /// Creates a new `RefreshNotAllowed` error.
    #[must_use]
    pub fn refresh_not_allowed(message: impl Into<String>) -> Self {
        Self::RefreshNotAllowed {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller is at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if the token itself was rejected.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::ParseFailure { .. }
                | Self::SignatureMismatch
                | Self::UnsignedToken
                | Self::NotYetValid
                | Self::MalformedIdentity { .. }
                | Self::Revoked
                | Self::ExpiredRefreshable { .. }
                | Self::ExpiredTerminal { .. }
        )
    }

    /// Returns `true` if the caller may recover by calling refresh.
    #[must_use]
    pub fn is_refreshable(&self) -> bool {
        matches!(self, Self::ExpiredRefreshable { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ParseFailure { .. } => ErrorCategory::Validation,
            Self::SignatureMismatch
            | Self::UnsignedToken
            | Self::NotYetValid
            | Self::MalformedIdentity { .. }
            | Self::Revoked => ErrorCategory::Token,
            Self::ExpiredRefreshable { .. } | Self::ExpiredTerminal { .. } => {
                ErrorCategory::Expiry
            }
            Self::MissingCredential { .. } => ErrorCategory::Authentication,
            Self::RefreshNotAllowed { .. } => ErrorCategory::Misuse,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Machine-distinguishable reason code surfaced to clients.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::ParseFailure { .. } => "parse_failure",
            Self::SignatureMismatch => "signature_mismatch",
            Self::UnsignedToken => "unsigned",
            Self::NotYetValid => "not_yet_valid",
            Self::MalformedIdentity { .. } => "malformed_identity",
            Self::Revoked => "revoked",
            Self::ExpiredRefreshable { .. } => "expired_refreshable",
            Self::ExpiredTerminal { .. } => "expired_terminal",
            Self::MissingCredential { .. } => "missing_credential",
            Self::RefreshNotAllowed { .. } => "refresh_not_allowed",
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "server_error"
            }
        }
    }

    /// Configured numeric code, present only for the two expiry outcomes.
    #[must_use]
    pub fn expiry_code(&self) -> Option<u32> {
        match self {
            Self::ExpiredRefreshable { code } | Self::ExpiredTerminal { code } => Some(*code),
            _ => None,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No usable credential was presented.
    Authentication,
    /// The token failed a trust check.
    Token,
    /// The token is past `exp`.
    Expiry,
    /// The token could not be decoded.
    Validation,
    /// The caller invoked an operation in the wrong state.
    Misuse,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Expiry => write!(f, "expiry"),
            Self::Validation => write!(f, "validation"),
            Self::Misuse => write!(f, "misuse"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::parse_failure("expected 3 segments");
        assert_eq!(err.to_string(), "Malformed token: expected 3 segments");

        let err = AuthError::ExpiredRefreshable { code: 50001 };
        assert_eq!(err.to_string(), "Token has expired, refresh it");

        let err = AuthError::refresh_not_allowed("token is still valid");
        assert_eq!(
            err.to_string(),
            "Refresh not allowed: token is still valid"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::SignatureMismatch.is_client_error());
        assert!(AuthError::SignatureMismatch.is_token_error());
        assert!(!AuthError::SignatureMismatch.is_refreshable());

        assert!(AuthError::ExpiredRefreshable { code: 1 }.is_refreshable());
        assert!(!AuthError::ExpiredTerminal { code: 2 }.is_refreshable());

        let err = AuthError::storage("store unreachable");
        assert!(err.is_server_error());
        assert!(!err.is_client_error());
        assert!(!err.is_token_error());

        assert!(!AuthError::missing_credential("header").is_token_error());
    }

    #[test]
    fn test_expiry_outcomes_are_distinguishable() {
        let refreshable = AuthError::ExpiredRefreshable { code: 50001 };
        let terminal = AuthError::ExpiredTerminal { code: 50002 };

        assert_ne!(refreshable.reason_code(), terminal.reason_code());
        assert_eq!(refreshable.expiry_code(), Some(50001));
        assert_eq!(terminal.expiry_code(), Some(50002));
        assert_eq!(AuthError::Revoked.expiry_code(), None);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(AuthError::Revoked.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::ExpiredTerminal { code: 0 }.category(),
            ErrorCategory::Expiry
        );
        assert_eq!(
            AuthError::refresh_not_allowed("x").category(),
            ErrorCategory::Misuse
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Expiry.to_string(), "expiry");
    }
}
