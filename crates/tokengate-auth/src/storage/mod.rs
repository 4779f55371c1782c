//! Storage traits and in-memory implementations.
//!
//! - [`RevocationStore`]: session registration and `jti` revocation
//! - [`UserDirectory`]: principal lookup after verification

pub mod memory;
pub mod revocation;
pub mod user;

pub use memory::{InMemoryRevocationStore, InMemoryUserDirectory};
pub use revocation::{RevocationStore, SessionMetadata, SessionRecord, SessionState};
pub use user::UserDirectory;
