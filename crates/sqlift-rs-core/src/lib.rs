//! # sqlift-rs-core
//!
//! Foundation types for the sqlift-rs query-to-SQL compiler: the error
//! taxonomy, library settings, and logging setup. This crate has no
//! project-internal dependencies and underpins the rest of the workspace.
//!
//! ## Modules
//!
//! - [`error`] - Error types and the result alias
//! - [`settings`] - Library settings and global configuration
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;

// Re-export the most commonly used types at the crate root.
pub use error::{SqliftError, SqliftResult};
pub use settings::{Settings, SETTINGS};
