//! Drift authorization.
//!
//! The token is loaded (or generated) once at startup by [`TokenStore`] and
//! shared read-only with every connection through the server context.

pub mod token;

pub use token::{AuthorizationToken, TokenError, TokenStore};
