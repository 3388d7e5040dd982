//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline, refresher, retry loop, inactivity monitor produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stderr (pretty for terminals, JSON for collectors)
//!     → whatever metrics recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - Tokens never appear in log fields
//! - The library installs no metrics recorder; counters are no-ops until the
//!   host application installs one

pub mod logging;
pub mod metrics;
