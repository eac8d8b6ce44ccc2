//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse)
//!     → schema.rs (fill defaults)
//!     → validation.rs (type and semantic checks, all errors collected)
//!     → %(here)s expansion
//!     → GlobalConfig (validated, immutable)
//!     → published into the startup context
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Validation problems are reported together, never one at a time
//! - Sections are looked up by name (`storage:publicstore`, `beaker.cache`)
//!   so storage and cache backends can carry their own free-form options

pub mod global;
pub mod loader;
pub mod schema;
pub mod validation;

pub use global::GlobalConfig;
pub use loader::{load_config, parse_config, read_config, ConfigError};
pub use schema::AppConfig;
pub use validation::{ValidationError, ValidationReport};
