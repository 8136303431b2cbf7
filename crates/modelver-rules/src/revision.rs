//! Consecutive version pairs

use modelver_schema::Version;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// One schema revision: the step from `from` to `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Version the rule consumes
    pub from: Version,
    /// Version the rule produces
    pub to: Version,
}

impl Revision {
    /// Create a revision
    #[inline]
    #[must_use]
    pub const fn new(from: Version, to: Version) -> Self {
        Self { from, to }
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
