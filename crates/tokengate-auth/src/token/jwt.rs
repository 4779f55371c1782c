//! Signing primitive and key material.
//!
//! The cryptographic primitive is an external capability: everything above
//! this module talks to it through [`SignaturePrimitive`], which signs and
//! verifies the `header.claims` signing input of a compact token. The
//! bundled [`JwtPrimitive`] is backed by `jsonwebtoken`.
//!
//! ## Supported Algorithms
//!
//! - **HS256 / HS384 / HS512**: HMAC with a shared secret
//! - **RS256 / RS384**: RSA PKCS#1 v1.5
//! - **ES384**: ECDSA with P-384 curve
//!
//! ## Example
//!
//! ```ignore
//! use tokengate_auth::token::jwt::{JwtPrimitive, SigningAlgorithm, SigningKeyPair};
//!
//! let key = SigningKeyPair::from_secret(SigningAlgorithm::HS256, secret.as_bytes())?;
//! let primitive = JwtPrimitive::new(key);
//!
//! let signature = primitive.sign(b"header.claims").await?;
//! assert!(primitive.verify(b"header.claims", &signature).await?);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use p384::SecretKey as EcSecretKey;
use p384::ecdsa::SigningKey as EcSigningKey;
use p384::pkcs8::EncodePrivateKey as EcEncodePrivateKey;
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use time::OffsetDateTime;

use crate::config::SigningConfig;
use crate::error::AuthError;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the signing primitive and key handling.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to produce a signature.
    #[error("Failed to sign token: {message}")]
    SigningError {
        /// Description of the signing error.
        message: String,
    },

    /// The primitive could not evaluate a signature.
    #[error("Failed to verify signature: {message}")]
    VerificationError {
        /// Description of the verification error.
        message: String,
    },

    /// The algorithm name is not supported.
    #[error("Unsupported algorithm: {alg}")]
    UnsupportedAlgorithm {
        /// The rejected algorithm name.
        alg: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `SigningError`.
    #[must_use]
    pub fn signing_error(message: impl Into<String>) -> Self {
        Self::SigningError {
            message: message.into(),
        }
    }

    /// Creates a new `VerificationError`.
    #[must_use]
    pub fn verification_error(message: impl Into<String>) -> Self {
        Self::VerificationError {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a key-related error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationError { .. } | Self::InvalidKey { .. }
        )
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        if err.is_key_error() || matches!(err, JwtError::UnsupportedAlgorithm { .. }) {
            AuthError::configuration(err.to_string())
        } else {
            AuthError::internal(err.to_string())
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
    /// RSA with SHA-256.
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// ECDSA with P-384 curve.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in the token header.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is a shared-secret algorithm.
    #[must_use]
    pub fn is_hmac(&self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384)
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        matches!(self, Self::ES384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "ES384" => Ok(Self::ES384),
            other => Err(JwtError::UnsupportedAlgorithm {
                alg: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// Key material for one algorithm: the signing half and the verifying half.
///
/// For HMAC both halves are derived from the same secret.
pub struct SigningKeyPair {
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (secret or private key) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (secret or public key) for verification.
    decoding_key: DecodingKey,

    /// When the key was loaded or created.
    pub created_at: OffsetDateTime,
}

impl SigningKeyPair {
    /// Builds an HMAC key from a shared secret.
    ///
    /// # Errors
    /// Returns an error if the algorithm is not HMAC-based or the secret is empty.
    pub fn from_secret(algorithm: SigningAlgorithm, secret: &[u8]) -> Result<Self, JwtError> {
        if !algorithm.is_hmac() {
            return Err(JwtError::invalid_key(format!(
                "Algorithm {} is not HMAC-based",
                algorithm
            )));
        }
        if secret.is_empty() {
            return Err(JwtError::invalid_key("HMAC secret cannot be empty"));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Generates a random 64-byte HMAC secret.
    ///
    /// # Errors
    /// Returns an error if the algorithm is not HMAC-based.
    pub fn generate_secret(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        let mut secret = [0u8; 64];
        OsRng.fill_bytes(&mut secret);
        Self::from_secret(algorithm, &secret)
    }

    /// Generates a new RSA key pair.
    ///
    /// # Errors
    /// Returns an error if key generation fails or algorithm is not RSA-based.
    pub fn generate_rsa(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        if !algorithm.is_rsa() {
            return Err(JwtError::invalid_key(format!(
                "Algorithm {} is not RSA-based",
                algorithm
            )));
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Self::from_pem(algorithm, &private_pem, &public_pem)
    }

    /// Generates a new EC key pair using P-384 curve.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate_ec() -> Result<Self, JwtError> {
        let secret_key = EcSecretKey::random(&mut OsRng);
        let signing_key = EcSigningKey::from(&secret_key);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| JwtError::key_generation_error("Missing x coordinate"))?;
        let y = point
            .y()
            .ok_or_else(|| JwtError::key_generation_error("Missing y coordinate"))?;

        // jsonwebtoken wants PKCS8 for the private half
        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;
        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let x_b64 = URL_SAFE_NO_PAD.encode(x.as_slice());
        let y_b64 = URL_SAFE_NO_PAD.encode(y.as_slice());
        let decoding_key = DecodingKey::from_ec_components(&x_b64, &y_b64)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Ok(Self {
            algorithm: SigningAlgorithm::ES384,
            encoding_key,
            decoding_key,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Loads an RSA or EC key pair from PEM strings.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid or the algorithm is HMAC.
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let (encoding_key, decoding_key) = if algorithm.is_rsa() {
            (
                EncodingKey::from_rsa_pem(private_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
                DecodingKey::from_rsa_pem(public_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
            )
        } else if algorithm.is_ec() {
            (
                EncodingKey::from_ec_pem(private_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
                DecodingKey::from_ec_pem(public_pem.as_bytes())
                    .map_err(|e| JwtError::invalid_key(e.to_string()))?,
            )
        } else {
            return Err(JwtError::invalid_key(format!(
                "Algorithm {} does not use PEM keys",
                algorithm
            )));
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Builds the key pair described by the signing configuration.
    ///
    /// Missing key material falls back to an ephemeral key, which means
    /// tokens do not survive a restart.
    ///
    /// # Errors
    /// Returns an error if the algorithm is unknown or the key material is invalid.
    pub fn from_config(config: &SigningConfig) -> Result<Self, JwtError> {
        let algorithm = SigningAlgorithm::from_str(&config.algorithm)?;

        if algorithm.is_hmac() {
            return match &config.secret {
                Some(secret) => Self::from_secret(algorithm, secret.as_bytes()),
                None => {
                    tracing::warn!(
                        algorithm = %algorithm,
                        "No signing secret configured, using an ephemeral secret"
                    );
                    Self::generate_secret(algorithm)
                }
            };
        }

        match (&config.private_key_pem, &config.public_key_pem) {
            (Some(private_pem), Some(public_pem)) => {
                Self::from_pem(algorithm, private_pem, public_pem)
            }
            _ => {
                tracing::warn!(
                    algorithm = %algorithm,
                    "No signing key pair configured, generating an ephemeral key pair"
                );
                if algorithm.is_ec() {
                    Self::generate_ec()
                } else {
                    Self::generate_rsa(algorithm)
                }
            }
        }
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Signature Primitive
// ============================================================================

/// The cryptographic capability used to seal and check tokens.
///
/// Implementations only see the signing input (`base64url(header) "."
/// base64url(claims)`) and the base64url signature segment; they never
/// interpret claims. Both operations may be slow or remote.
#[async_trait]
pub trait SignaturePrimitive: Send + Sync {
    /// The algorithm this primitive signs with.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Signs the signing input and returns the base64url signature segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the primitive cannot produce a signature.
    async fn sign(&self, signing_input: &[u8]) -> Result<String, JwtError>;

    /// Checks a base64url signature segment against the signing input.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature cannot be evaluated at all.
    async fn verify(&self, signing_input: &[u8], signature: &str) -> Result<bool, JwtError>;
}

/// [`SignaturePrimitive`] backed by `jsonwebtoken`'s crypto functions.
///
/// RSA and EC operations run on the blocking pool so they do not stall the
/// async runtime; HMAC runs inline.
#[derive(Debug, Clone)]
pub struct JwtPrimitive {
    key: Arc<SigningKeyPair>,
}

impl JwtPrimitive {
    /// Creates a primitive around the given key pair.
    #[must_use]
    pub fn new(key: SigningKeyPair) -> Self {
        Self { key: Arc::new(key) }
    }
}

#[async_trait]
impl SignaturePrimitive for JwtPrimitive {
    fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm
    }

    async fn sign(&self, signing_input: &[u8]) -> Result<String, JwtError> {
        let algorithm = self.key.algorithm.to_jwt_algorithm();

        if self.key.algorithm.is_hmac() {
            return jsonwebtoken::crypto::sign(signing_input, &self.key.encoding_key, algorithm)
                .map_err(|e| JwtError::signing_error(e.to_string()));
        }

        let key = Arc::clone(&self.key);
        let message = signing_input.to_vec();
        tokio::task::spawn_blocking(move || {
            jsonwebtoken::crypto::sign(&message, &key.encoding_key, algorithm)
        })
        .await
        .map_err(|e| JwtError::signing_error(e.to_string()))?
        .map_err(|e| JwtError::signing_error(e.to_string()))
    }

    async fn verify(&self, signing_input: &[u8], signature: &str) -> Result<bool, JwtError> {
        let algorithm = self.key.algorithm.to_jwt_algorithm();

        if self.key.algorithm.is_hmac() {
            return jsonwebtoken::crypto::verify(
                signature,
                signing_input,
                &self.key.decoding_key,
                algorithm,
            )
            .map_err(|e| JwtError::verification_error(e.to_string()));
        }

        let key = Arc::clone(&self.key);
        let message = signing_input.to_vec();
        let signature = signature.to_string();
        tokio::task::spawn_blocking(move || {
            jsonwebtoken::crypto::verify(&signature, &message, &key.decoding_key, algorithm)
        })
        .await
        .map_err(|e| JwtError::verification_error(e.to_string()))?
        .map_err(|e| JwtError::verification_error(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
