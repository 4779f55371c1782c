//! Two-tier expiry policy.
//!
//! A token past `exp` is still exchangeable for a fresh one while
//! `now < iat + refresh_ttl`. The window is anchored on issuance, not on
//! expiry, so a refresh window of 2h with a 1h lifetime leaves one hour of
//! refreshability after expiry.

use crate::config::AuthConfig;

use super::claims::Claims;

/// Classification of a token that failed the `exp` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryClass {
    /// Still inside the refresh window.
    Refreshable,
    /// Past the refresh window; a new login is required.
    Terminal,
}

/// Decides whether an expired token may be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    refresh_ttl: i64,
}

impl RefreshPolicy {
    /// Creates a policy with the given refresh window in seconds.
    #[must_use]
    pub fn new(refresh_ttl: i64) -> Self {
        Self { refresh_ttl }
    }

    /// Creates a policy from the configured `refresh_ttl`.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.refresh_ttl_secs())
    }

    /// End of the refresh window (exclusive), as a Unix timestamp.
    #[must_use]
    pub fn refresh_deadline(&self, claims: &Claims) -> i64 {
        claims.iat.saturating_add(self.refresh_ttl)
    }

    /// Classifies an expired token. The boundary itself is terminal.
    #[must_use]
    pub fn classify_expired(&self, claims: &Claims, now: i64) -> ExpiryClass {
        if now < self.refresh_deadline(claims) {
            ExpiryClass::Refreshable
        } else {
            ExpiryClass::Terminal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: i64, ttl: i64) -> Claims {
        Claims {
            iss: "tokengate".to_string(),
            aud: "tokengate-clients".to_string(),
            jti: "j".to_string(),
            iat,
            nbf: iat,
            exp: iat + ttl,
            custom: Default::default(),
        }
    }

    #[test]
    fn test_window_anchored_on_iat() {
        let policy = RefreshPolicy::new(86_400);
        let claims = claims(0, 3_600);

        assert_eq!(policy.refresh_deadline(&claims), 86_400);
        assert_eq!(policy.classify_expired(&claims, 4_000), ExpiryClass::Refreshable);
        assert_eq!(policy.classify_expired(&claims, 90_000), ExpiryClass::Terminal);
    }

    #[test]
    fn test_boundary_is_terminal() {
        let policy = RefreshPolicy::new(7_200);
        let claims = claims(1_000, 3_600);

        assert_eq!(policy.classify_expired(&claims, 8_199), ExpiryClass::Refreshable);
        assert_eq!(policy.classify_expired(&claims, 8_200), ExpiryClass::Terminal);
    }

    #[test]
    fn test_from_config() {
        let policy = RefreshPolicy::from_config(&AuthConfig::default());
        assert_eq!(policy.refresh_deadline(&claims(0, 3_600)), 7_200);
    }
}
