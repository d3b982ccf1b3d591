//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound read on a connection:
//!     → timeouts.rs (deadline per read, TLS handshake, shutdown drain)
//! ```
//!
//! # Design Decisions
//! - Every wait on a peer has a deadline
//! - A timeout is a distinct error, never folded into I/O failures

pub mod timeouts;

pub use timeouts::{with_timeout, TimedOut};
