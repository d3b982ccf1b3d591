//! Protocol engine primitives.
//!
//! # Data Flow
//! ```text
//! transport bytes
//!     → frame.rs (LineReader: newline-delimited lines, raw bytes kept intact)
//!     → request.rs (Standard locator | Drift upload directive)
//!     → locator.rs (scheme/host stripped, traversal segments removed)
//!     → response.rs (status line + header block + body)
//! ```
//!
//! Everything here is synchronous and performs no I/O; the session layer
//! drives it from the connection task.

pub mod error;
pub mod frame;
pub mod locator;
pub mod request;
pub mod response;

pub use error::{FrameError, RequestError};
pub use frame::{LineReader, DEFAULT_MAX_LINE};
pub use locator::{resource_path, DEFAULT_DOCUMENT};
pub use request::{is_header_line, parse, Request};
pub use response::{Response, Status, SKY_MIME};
