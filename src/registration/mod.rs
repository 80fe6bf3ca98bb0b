//! Service registration through pod labels.
//!
//! # Data Flow
//! ```text
//! Host startup:
//!     HostState → state.rs (initial label set)
//!     → notifier.rs (existence check, initial patch, spawn shutdown listener)
//!
//! Host state change:
//!     notify_*_state_change → single-label patch → error to caller
//!
//! Shutdown signal:
//!     listener → final label set → warn on failure
//! ```
//!
//! # Design Decisions
//! - Nothing is cached; each notification is an independent request
//! - Concurrent writers to one label resolve last-writer-wins at the server
//! - No retries

pub mod notifier;
pub mod state;

pub use notifier::{resolve_identity, RegistrationState, ServiceRegistration};
pub use state::{final_tags, HostState};
