//! Building-model document model
//!
//! An in-memory, mutable representation of a model file: an ordered
//! collection of typed records with positional fields, cross-referencing
//! each other by stable identity.
//!
//! # Core Concepts
//!
//! - [`Document`]: ordered records plus the declared schema [`Version`]
//! - [`Record`]: one object instance, addressed by [`RecordId`]
//! - [`Field`]: blank, text, number, or reference
//! - [`Fingerprint`]: Blake3 hash of a document's content

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod document;
mod error;
mod fingerprint;
mod record;

pub use document::Document;
pub use error::{DocumentError, DocumentResult, FieldLocation};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use modelver_schema::Version;
pub use record::{Field, Record, RecordId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
