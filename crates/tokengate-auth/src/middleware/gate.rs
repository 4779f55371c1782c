//! Session gate: extract, parse, verify and bind an identity per request.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use tokengate_auth::middleware::{Authenticated, SessionGate, require_session};
//!
//! async fn me(Authenticated(identity): Authenticated) -> String {
//!     format!("session {}", identity.jti())
//! }
//!
//! let gate = SessionGate::new(service).with_user_directory(users);
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(gate.clone(), require_session))
//!     .with_state(gate);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{Method, request::Parts},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::UserDirectory;
use crate::token::{Claims, TokenParser, TokenService};
use crate::types::{AuthenticatedIdentity, UserIdentity};

use super::source::{RequestTokenSource, TokenSource};

// =============================================================================
// Session Gate
// =============================================================================

/// State required to authenticate requests.
///
/// Include it in the application state and expose it through `FromRef`
/// for the extractors, or pass it to [`require_session`] directly.
#[derive(Clone)]
pub struct SessionGate {
    service: Arc<TokenService>,
    users: Option<Arc<dyn UserDirectory>>,
}

impl SessionGate {
    /// Creates a gate without a user directory; identities stay unbound.
    pub fn new(service: Arc<TokenService>) -> Self {
        Self {
            service,
            users: None,
        }
    }

    /// Resolves principals through the given directory.
    #[must_use]
    pub fn with_user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    /// The token service behind the gate.
    #[must_use]
    pub fn service(&self) -> &Arc<TokenService> {
        &self.service
    }

    /// Reads the raw token from the configured transport.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredential` if no token is present.
    pub fn extract<S: TokenSource + ?Sized>(&self, source: &S) -> AuthResult<String> {
        let transport = &self.service.config().transport;
        source.get_token(transport).ok_or_else(|| {
            AuthError::missing_credential(format!(
                "no token found in {} transport",
                transport.kind.as_str()
            ))
        })
    }

    /// Authenticates the token carried by `source`.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` if there is no token, `ParseFailure` if it
    /// is malformed, the rejection reason if it fails verification, and
    /// `Storage` if the revocation store or user directory fails.
    pub async fn authenticate<S: TokenSource + ?Sized>(
        &self,
        source: &S,
    ) -> AuthResult<AuthenticatedIdentity> {
        let raw = self.extract(source)?;
        self.authenticate_token(&raw, now()).await
    }

    /// Authenticates a raw token as of `now` (Unix timestamp).
    ///
    /// # Errors
    ///
    /// See [`authenticate`](Self::authenticate).
    pub async fn authenticate_token(
        &self,
        raw: &str,
        now: i64,
    ) -> AuthResult<AuthenticatedIdentity> {
        let token = TokenParser::parse(raw).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected malformed token");
        })?;

        let claims = self
            .service
            .verify(&token, now)
            .await?
            .into_result(&self.service.config().codes)?;

        let user = self.bind_user(&claims).await?;
        let identity = AuthenticatedIdentity::new(claims, user);

        tracing::debug!(
            jti = %identity.jti(),
            user_bound = identity.is_user_bound(),
            "Token validated successfully"
        );
        Ok(identity)
    }

    async fn bind_user(&self, claims: &Claims) -> AuthResult<Option<UserIdentity>> {
        let binding = &self.service.config().user_binding;
        if !binding.enabled {
            return Ok(None);
        }
        let Some(users) = &self.users else {
            return Ok(None);
        };
        let Some(principal) = claims.principal(&binding.claim) else {
            return Ok(None);
        };

        let user = users.lookup(&principal, claims).await?;
        if user.is_none() {
            // the user may have been removed after the token was issued
            tracing::debug!(principal = %principal, "Principal not found in user directory");
        }
        Ok(user)
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor yielding the request's [`AuthenticatedIdentity`].
///
/// Reuses the identity inserted by [`require_session`] when present and
/// authenticates the request itself otherwise.
///
/// # Example
///
/// ```ignore
/// async fn handler(Authenticated(identity): Authenticated) -> impl IntoResponse {
///     identity.claim("username").cloned().unwrap_or_default().to_string()
/// }
/// ```
pub struct Authenticated(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
    SessionGate: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<AuthenticatedIdentity>() {
            return Ok(Self(identity.clone()));
        }

        let gate = SessionGate::from_ref(state);
        let raw = gate.extract(&RequestTokenSource::from(&*parts))?;
        gate.authenticate_token(&raw, now()).await.map(Self)
    }
}

/// Extractor that yields `None` when the request carries no token.
///
/// A token that is present but fails authentication is still rejected.
pub struct OptionalAuthenticated(pub Option<AuthenticatedIdentity>);

impl<S> FromRequestParts<S> for OptionalAuthenticated
where
    S: Send + Sync,
    SessionGate: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<AuthenticatedIdentity>() {
            return Ok(Self(Some(identity.clone())));
        }

        let gate = SessionGate::from_ref(state);
        let raw = match gate.extract(&RequestTokenSource::from(&*parts)) {
            Ok(raw) => raw,
            Err(AuthError::MissingCredential { .. }) => return Ok(Self(None)),
            Err(e) => return Err(e),
        };
        gate.authenticate_token(&raw, now())
            .await
            .map(|identity| Self(Some(identity)))
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Middleware that rejects requests without a valid session.
///
/// `OPTIONS` preflight requests pass through untouched. On success the
/// [`AuthenticatedIdentity`] is inserted into the request extensions.
///
/// # Errors
///
/// Returns the [`AuthError`] from [`SessionGate::authenticate`], rendered
/// as an error response.
pub async fn require_session(
    State(gate): State<SessionGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let raw = gate.extract(&RequestTokenSource::new(request.headers(), request.uri()))?;
    let identity = gate.authenticate_token(&raw, now()).await?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
