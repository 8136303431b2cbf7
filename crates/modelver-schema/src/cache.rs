//! Cached schema accessor using moka
//!
//! Wraps any [`SchemaAccessor`] with a bounded concurrent cache keyed by
//! `(object_type, version)`.

use crate::{ObjectSchema, SchemaAccessor, SchemaError, Version};
use moka::sync::Cache;
use std::sync::Arc;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Schema accessor with a concurrent lookup cache
///
/// Only successful lookups are cached. Unknown pairs are asked of the inner
/// accessor every time.
#[derive(Debug, Clone)]
pub struct CachedSchema<A> {
    inner: A,
    cache: Cache<(String, Version), Arc<ObjectSchema>>,
}

impl<A: SchemaAccessor> CachedSchema<A> {
    /// Wrap `inner` with a cache of at most `max_capacity` entries
    #[inline]
    #[must_use]
    pub fn new(inner: A, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
        }
    }

    /// Wrapped accessor
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Drop every cached entry
    #[inline]
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Whether a pair is currently cached
    #[inline]
    #[must_use]
    pub fn contains(&self, object_type: &str, version: &Version) -> bool {
        self.cache
            .contains_key(&(object_type.to_string(), *version))
    }

    /// Get cache statistics
    ///
    /// Runs pending maintenance first so the count reflects recent inserts.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            entry_count: self.cache.entry_count(),
        }
    }
}

impl<A: SchemaAccessor> SchemaAccessor for CachedSchema<A> {
    fn versions(&self) -> Vec<Version> {
        self.inner.versions()
    }

    fn object_schema(
        &self,
        object_type: &str,
        version: &Version,
    ) -> Result<Arc<ObjectSchema>, SchemaError> {
        let key = (object_type.to_string(), *version);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let schema = self.inner.object_schema(object_type, version)?;
        tracing::trace!(object_type, %version, "schema cache fill");
        self.cache.insert(key, Arc::clone(&schema));
        Ok(schema)
    }

    fn knows_version(&self, version: &Version) -> bool {
        self.inner.knows_version(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingAccessor {
        calls: AtomicUsize,
    }

    impl SchemaAccessor for CountingAccessor {
        fn versions(&self) -> Vec<Version> {
            vec![Version::new(1, 0, 0)]
        }

        fn object_schema(
            &self,
            object_type: &str,
            version: &Version,
        ) -> Result<Arc<ObjectSchema>, SchemaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if object_type == "OS:Known" {
                Ok(Arc::new(ObjectSchema::new(object_type, ["Name"])))
            } else {
                Err(SchemaError::unknown_object_type(object_type, *version))
            }
        }
    }

    #[test]
    fn successful_lookups_are_cached() {
        let cached = CachedSchema::new(CountingAccessor::default(), 16);
        let v = Version::new(1, 0, 0);

        assert_eq!(cached.field_count("OS:Known", &v).unwrap(), 1);
        assert_eq!(cached.field_count("OS:Known", &v).unwrap(), 1);
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
        assert!(cached.contains("OS:Known", &v));
        assert_eq!(cached.stats().entry_count, 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let cached = CachedSchema::new(CountingAccessor::default(), 16);
        let v = Version::new(1, 0, 0);

        assert!(cached.object_schema("OS:Unknown", &v).is_err());
        assert!(cached.object_schema("OS:Unknown", &v).is_err());
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
        assert!(!cached.contains("OS:Unknown", &v));
    }

    #[test]
    fn invalidate_all_forces_refill() {
        let cached = CachedSchema::new(CountingAccessor::default(), 16);
        let v = Version::new(1, 0, 0);

        cached.object_schema("OS:Known", &v).unwrap();
        cached.invalidate_all();
        cached.object_schema("OS:Known", &v).unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }
}
