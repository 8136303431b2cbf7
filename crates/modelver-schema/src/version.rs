//! Schema release identifiers
//!
//! Provides [`Version`], a `major.minor.patch` triple ordered numerically.

use crate::SchemaError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A schema release version
///
/// Ordering is numeric per component, so `2.10.0 > 2.9.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl Version {
    /// Create a new version
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string
    ///
    /// Accepts `"3.1.0"` and the short form `"3.1"` (patch defaults to 0).
    ///
    /// # Errors
    /// Returns [`SchemaError::InvalidVersion`] for anything else
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let invalid = || SchemaError::InvalidVersion(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid());
        }

        let component = |p: &str| -> Result<u32, SchemaError> {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            p.parse::<u32>().map_err(|_| invalid())
        };

        let major = component(parts[0])?;
        let minor = component(parts[1])?;
        let patch = match parts.get(2) {
            Some(p) => component(p)?,
            None => 0,
        };
        Ok(Self::new(major, minor, patch))
    }

    /// Major component
    #[inline]
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Minor component
    #[inline]
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Patch component
    #[inline]
    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// Whether `candidate` is exactly one increment ahead of `self`
    ///
    /// One increment means a patch bump, a minor bump with patch reset, or a
    /// major bump with minor and patch reset.
    #[must_use]
    pub fn is_next_version(&self, candidate: &Version) -> bool {
        let patch_bump = candidate.major == self.major
            && candidate.minor == self.minor
            && candidate.patch == self.patch + 1;
        let minor_bump = candidate.major == self.major
            && candidate.minor == self.minor + 1
            && candidate.patch == 0;
        let major_bump =
            candidate.major == self.major + 1 && candidate.minor == 0 && candidate.patch == 0;
        patch_bump || minor_bump || major_bump
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
