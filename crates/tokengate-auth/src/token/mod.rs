//! Token construction, encoding and verification.
//!
//! - [`claims`]: claim set and builder
//! - [`compact`]: encoded token representation
//! - [`jwt`]: signing primitive and key material
//! - [`signer`] / [`parser`]: encode and decode
//! - [`verifier`]: ordered trust checks
//! - [`refresh`]: expiry classification
//! - [`service`]: issue, authenticate, refresh and logout

pub mod claims;
pub mod compact;
pub mod jwt;
pub mod parser;
pub mod refresh;
pub mod service;
pub mod signer;
pub mod verifier;

pub use claims::{Claims, ClaimsBuilder, CustomClaims};
pub use compact::{Token, TokenHeader};
pub use jwt::{JwtError, JwtPrimitive, SignaturePrimitive, SigningAlgorithm, SigningKeyPair};
pub use parser::TokenParser;
pub use refresh::{ExpiryClass, RefreshPolicy};
pub use service::TokenService;
pub use signer::TokenSigner;
pub use verifier::{InvalidReason, TokenVerifier, VerificationOutcome};
