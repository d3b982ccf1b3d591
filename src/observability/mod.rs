//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Listener, sessions, Drift uploads produce:
//!     → logging.rs (structured log events, text or JSON)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every log line for a connection carries its `connection_id`
//! - Authorization tokens never appear in logs
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
