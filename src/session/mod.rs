//! Connection sessions.
//!
//! # Data Flow
//! ```text
//! Transport chunk
//!     → connection.rs (read loop, one response per connection)
//!     → state.rs (AwaitingLine → DispatchingStandard | ReceivingBody → Closed)
//!     → drift.rs (authorized uploads, streamed to an UploadStore)
//! ```
//!
//! # Design Decisions
//! - Protocol decisions never depend on how the transport chunked the input
//! - Once the request line selects Drift, bytes are never parsed as text again
//! - Shared process state lives in a read-only `ServerContext`

pub mod connection;
pub mod context;
pub mod drift;
pub mod state;

pub use connection::{serve, Session, SessionError, READ_CHUNK_SIZE};
pub use context::{ServerContext, SessionLimits};
pub use drift::{DriftError, DriftUpload, Progress};
pub use state::{ConnectionState, IllegalTransition};
