//! Content fingerprints of documents
//!
//! A [`Fingerprint`] is the Blake3 hash of a document's canonical JSON
//! encoding. Two documents with equal fingerprints have identical versions,
//! record order, identities and field values.

use std::fmt::{self, Display, Formatter};

/// A 32-byte Blake3 content fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash the JSON encoding of a serializable value
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn of_serializable<T>(value: &T) -> Result<Self, FingerprintError>
    where
        T: serde::Serialize + ?Sized,
    {
        let json = serde_json::to_vec(value)?;
        Ok(Self::compute(&json))
    }

    /// First 16 hex chars, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Errors computing fingerprints
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Value could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
