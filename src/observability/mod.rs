//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Startup steps, storage and cache produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → whatever metrics recorder the embedding process installs
//! ```
//!
//! # Design Decisions
//! - Structured fields, not formatted strings
//! - Log level from config, overridable through `RUST_LOG`
//! - No recorder installed here: without one, metric calls are no-ops

pub mod logging;
pub mod metrics;
