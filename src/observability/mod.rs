//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! kubernetes + registration produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (request and notification counters)
//! ```
//!
//! # Design Decisions
//! - Structured fields carry namespace, pod, method and status
//! - Request headers are never logged
//! - Metrics export is optional and off by default

pub mod logging;
pub mod metrics;
