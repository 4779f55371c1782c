use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokengate_auth::{
    AuthConfig, AuthError, CustomClaims, InMemoryRevocationStore, InvalidReason, RevocationStore,
    TokenParser, TokenService, VerificationOutcome,
};

const SECRET: &str = "integration-secret-integration-secret";

fn config(ttl: u64, refresh_ttl: u64) -> AuthConfig {
    let mut config = AuthConfig {
        issuer: "https://auth.example.com".to_string(),
        audience: "https://api.example.com".to_string(),
        ttl: Duration::from_secs(ttl),
        refresh_ttl: Duration::from_secs(refresh_ttl),
        ..AuthConfig::default()
    };
    config.signing.secret = Some(SECRET.to_string());
    config
}

fn service_with(config: AuthConfig) -> (TokenService, Arc<InMemoryRevocationStore>) {
    let store = Arc::new(InMemoryRevocationStore::new());
    let service = TokenService::from_config(config, store.clone()).expect("valid config");
    (service, store)
}

fn service() -> (TokenService, Arc<InMemoryRevocationStore>) {
    service_with(config(3_600, 86_400))
}

#[tokio::test]
async fn issued_tokens_have_ordered_times_and_distinct_ids() {
    let (service, _) = service_with(AuthConfig {
        not_before: Duration::from_secs(5),
        ..config(3_600, 86_400)
    });

    let mut ids = HashSet::new();
    for i in 0..10_000 {
        let token = service.issue_at(CustomClaims::new(), i).await.unwrap();
        let claims = token.claims();
        assert!(claims.nbf >= claims.iat);
        assert!(claims.exp > claims.nbf);
        assert!(ids.insert(claims.jti.clone()), "duplicate jti {}", claims.jti);
    }
    assert_eq!(ids.len(), 10_000);
}

#[tokio::test]
async fn custom_claims_round_trip() {
    let (service, _) = service();

    let mut custom = CustomClaims::new();
    for i in 0..50 {
        let value = match i % 5 {
            0 => json!(format!("value-{i}")),
            1 => json!(i),
            2 => json!(i % 2 == 0),
            3 => json!(-1.5 * f64::from(i)),
            _ => json!(null),
        };
        custom.insert(format!("claim_{i}"), value);
    }

    let token = service.issue_at(custom.clone(), 0).await.unwrap();
    let parsed = TokenParser::parse(token.as_str()).unwrap();

    assert_eq!(parsed.claims(), token.claims());
    assert_eq!(parsed.claims().custom, custom);
    assert_eq!(parsed.header(), token.header());
}

#[tokio::test]
async fn valid_between_nbf_and_exp() {
    let (service, _) = service();
    let token = service.issue_at(CustomClaims::new(), 0).await.unwrap();

    for now in [0, 1, 1_800, 3_599, 3_600] {
        let outcome = service.verify(&token, now).await.unwrap();
        assert!(outcome.is_valid(), "expected valid at {now}");
    }
}

#[tokio::test]
async fn not_yet_valid_before_nbf() {
    let (service, _) = service_with(AuthConfig {
        not_before: Duration::from_secs(60),
        ..config(3_600, 86_400)
    });
    let token = service.issue_at(CustomClaims::new(), 1_000).await.unwrap();

    let outcome = service.verify(&token, 1_059).await.unwrap();
    assert_eq!(outcome.reason(), Some(InvalidReason::NotYetValid));
    assert!(service.verify(&token, 1_060).await.unwrap().is_valid());
}

#[tokio::test]
async fn expiry_scenario() {
    let (service, _) = service();
    let token = service.issue_at(CustomClaims::new(), 0).await.unwrap();
    assert_eq!(token.claims().exp, 3_600);

    let outcome = service.verify(&token, 4_000).await.unwrap();
    assert_eq!(outcome.reason(), Some(InvalidReason::ExpiredRefreshable));

    let outcome = service.verify(&token, 90_000).await.unwrap();
    assert_eq!(outcome.reason(), Some(InvalidReason::ExpiredTerminal));
}

#[tokio::test]
async fn refresh_window_boundary_is_terminal() {
    let (service, _) = service();
    let token = service.issue_at(CustomClaims::new(), 100).await.unwrap();

    let outcome = service.verify(&token, 86_499).await.unwrap();
    assert_eq!(outcome.reason(), Some(InvalidReason::ExpiredRefreshable));

    let outcome = service.verify(&token, 86_500).await.unwrap();
    assert_eq!(outcome.reason(), Some(InvalidReason::ExpiredTerminal));
}

#[tokio::test]
async fn tampered_claims_never_verify() {
    let (service, _) = service();
    let mut custom = CustomClaims::new();
    custom.insert("uid".to_string(), json!("user-1"));
    custom.insert("roles".to_string(), json!(["admin"]));
    let token = service.issue_at(custom, 0).await.unwrap();

    let raw = token.as_str();
    let claims_start = raw.find('.').unwrap() + 1;
    let claims_end = raw.rfind('.').unwrap();

    let mut verified_as_mismatch = 0;
    for i in claims_start..claims_end {
        let mut bytes = raw.as_bytes().to_vec();
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        match TokenParser::parse(&tampered) {
            Ok(parsed) => {
                let outcome = service.verify(&parsed, 10).await.unwrap();
                assert_eq!(
                    outcome.reason(),
                    Some(InvalidReason::SignatureMismatch),
                    "byte {i}"
                );
                verified_as_mismatch += 1;
            }
            Err(err) => assert!(matches!(err, AuthError::ParseFailure { .. })),
        }
    }
    assert!(verified_as_mismatch > 0);
}

#[tokio::test]
async fn revoked_jti_is_rejected() {
    let (service, store) = service();
    let token = service.issue_at(CustomClaims::new(), 0).await.unwrap();

    store.revoke(token.jti(), 86_400).await.unwrap();

    let outcome = service.verify(&token, 10).await.unwrap();
    assert_eq!(outcome, VerificationOutcome::Invalid(InvalidReason::Revoked));
}

#[tokio::test]
async fn refresh_supersedes_old_token() {
    let (service, _) = service();
    let mut custom = CustomClaims::new();
    custom.insert("uid".to_string(), json!(42));
    let token = service.issue_at(custom, 0).await.unwrap();

    let refreshed = service.refresh_at(&token, 4_000).await.unwrap();
    assert_ne!(refreshed.jti(), token.jti());
    assert_eq!(refreshed.claims().get("uid"), Some(&json!(42)));
    assert_eq!(refreshed.claims().exp, 4_000 + 3_600);

    let old = service.verify(&token, 4_001).await.unwrap();
    assert_eq!(old.reason(), Some(InvalidReason::Revoked));
    assert!(service.verify(&refreshed, 4_001).await.unwrap().is_valid());
}

#[tokio::test]
async fn concurrent_refresh_has_single_winner() {
    let (service, _) = service();
    let service = Arc::new(service);
    let token = service.issue_at(CustomClaims::new(), 0).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let token = token.clone();
            tokio::spawn(async move { service.refresh_at(&token, 4_000).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert!(matches!(err, AuthError::Revoked)),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn token_from_other_issuer_is_malformed_identity() {
    let (service, _) = service();
    let (other, _) = service_with(AuthConfig {
        issuer: "https://other.example.com".to_string(),
        ..config(3_600, 86_400)
    });

    // same secret, different issuer
    let token = other.issue_at(CustomClaims::new(), 0).await.unwrap();
    let outcome = service.verify(&token, 10).await.unwrap();
    assert_eq!(outcome.reason(), Some(InvalidReason::MalformedIdentity));
}

#[tokio::test]
async fn asymmetric_keys_sign_and_verify() {
    let mut config = config(3_600, 86_400);
    config.signing.algorithm = "ES384".to_string();
    config.signing.secret = None;
    let (service, _) = service_with(config);

    let token = service.issue_at(CustomClaims::new(), 0).await.unwrap();
    assert_eq!(token.header().alg, "ES384");
    assert!(service.verify(&token, 10).await.unwrap().is_valid());
}
