//! HTTP integration for axum.
//!
//! - [`source`]: reading the raw token from a request
//! - [`gate`]: [`SessionGate`], extractors and the [`require_session`] layer
//! - [`error`]: `IntoResponse` for [`AuthError`](crate::AuthError)

pub mod error;
pub mod gate;
pub mod source;

pub use gate::{Authenticated, OptionalAuthenticated, SessionGate, require_session};
pub use source::{RequestTokenSource, TokenSource};
