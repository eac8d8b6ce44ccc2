//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Database check → Templates → Static assets
//!         → Storage → Workbench → Cache → Freeze context
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then the subsystems that read it
//! - Startup ends with an immutable context; nothing is torn down or
//!   reloaded afterwards

pub mod startup;

pub use startup::{
    bootstrap, bootstrap_with, setup_cache, setup_database, setup_global_and_app_config,
    setup_static_director, setup_storage, setup_templates, setup_workbench,
};
