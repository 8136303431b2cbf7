//! Migration engine for building-model documents
//!
//! Takes a document declared against an older schema release and applies
//! every update rule of a [`VersionChain`](modelver_rules::VersionChain) in
//! order, validating record layouts and references after each one.
//!
//! # Core Concepts
//!
//! - [`MigrationEngine`]: the per-document state machine
//! - [`EngineConfig`]: TOML-loadable engine options
//! - [`MigrationOutcome`]: migrated document, versions, diagnostics, steps
//! - [`MigrationFailure`]: a fatal [`MigrationError`] with what was gathered
//!
//! # Example
//!
//! ```rust,ignore
//! use modelver_engine::{EngineConfig, MigrationEngine};
//!
//! let engine = MigrationEngine::with_builtin(EngineConfig::default())?;
//! let outcome = engine.migrate(&document)?;
//! if outcome.did_migrate {
//!     save(&outcome.document)?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod batch;
mod config;
mod engine;
mod error;
mod report;
pub mod state;

pub use batch::{BatchStats, MigrationResult};
pub use config::{ConfigError, EngineConfig};
pub use engine::MigrationEngine;
pub use error::{EngineError, MigrationError, MigrationFailure};
pub use report::{MigrationOutcome, MigrationSummary, StepReport};
pub use state::MigrationState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
