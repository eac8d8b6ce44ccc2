//! Startup wiring for a federated media-hosting service.

pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod staticdirect;
pub mod storage;
pub mod templates;
pub mod workbench;

pub use context::{AppContext, ContextBuilder};
pub use error::Error;
pub use lifecycle::bootstrap;
