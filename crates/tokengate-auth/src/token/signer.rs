//! Token signing.

use std::sync::Arc;

use crate::AuthResult;

use super::claims::Claims;
use super::compact::{Token, TokenHeader, encode_segment};
use super::jwt::{SignaturePrimitive, SigningAlgorithm};

/// Seals claims into a compact token through a [`SignaturePrimitive`].
///
/// The header carries the primitive's algorithm, `typ = "JWT"` and a copy
/// of the `jti` claim.
#[derive(Clone)]
pub struct TokenSigner {
    primitive: Arc<dyn SignaturePrimitive>,
}

impl TokenSigner {
    /// Creates a signer around the given primitive.
    pub fn new(primitive: Arc<dyn SignaturePrimitive>) -> Self {
        Self { primitive }
    }

    /// Algorithm written into the header.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.primitive.algorithm()
    }

    /// Signs the claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized or the primitive
    /// fails to sign.
    pub async fn sign(&self, claims: Claims) -> AuthResult<Token> {
        let header = TokenHeader::new(self.algorithm().as_str(), claims.jti.clone());
        let signing_input = format!(
            "{}.{}",
            encode_segment(&header)?,
            encode_segment(&claims)?
        );
        let signature = self.primitive.sign(signing_input.as_bytes()).await?;

        Token::new(header, claims, format!("{signing_input}.{signature}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::token::jwt::{JwtPrimitive, SigningKeyPair};

    #[tokio::test]
    async fn test_signed_token_layout() {
        let key =
            SigningKeyPair::from_secret(SigningAlgorithm::HS256, b"0123456789abcdef0123456789abcdef")
                .unwrap();
        let signer = TokenSigner::new(Arc::new(JwtPrimitive::new(key)));
        let claims = Claims::builder(&AuthConfig::default()).claim("uid", 7).build();
        let jti = claims.jti.clone();

        let token = signer.sign(claims).await.unwrap();

        assert_eq!(token.as_str().split('.').count(), 3);
        assert!(token.is_signed());
        assert_eq!(token.header().alg, "HS256");
        assert_eq!(token.header().typ.as_deref(), Some("JWT"));
        assert_eq!(token.header().jti.as_deref(), Some(jti.as_str()));
        assert_eq!(token.jti(), jti);
    }
}
