//! Sky protocol server library.
//!
//! A Sky connection carries exactly one request and one response. The
//! request line is either a locator (Standard request) or an authorized
//! `DRIFT size=<n>;token=<t>` header followed by exactly `n` raw bytes.

pub mod auth;
pub mod config;
pub mod content;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod resilience;
pub mod server;
pub mod session;
pub mod storage;

pub use config::schema::ServerConfig;
pub use lifecycle::Shutdown;
pub use server::{build_context, ServerError, SkyServer};
