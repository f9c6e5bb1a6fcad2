//! Backend-agnostic detection of uniqueness violations.
//!
//! Every database driver reports a duplicate primary key differently
//! (PostgreSQL uses SQLSTATE `23505`, the in-memory backend uses its own error
//! type). Backends register a predicate here while the process is wired up, and
//! the stores ask the registry instead of knowing about any driver.

use std::error::Error as StdError;
use std::fmt;

use tracing::debug;

use crate::error::StorageError;

type Checker = Box<dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync>;

/// Append-only set of "is this a uniqueness violation?" predicates.
#[derive(Default)]
pub struct AlreadyExistsRegistry {
    checkers: Vec<(&'static str, Checker)>,
}

impl AlreadyExistsRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under a backend name.
    pub fn register<F>(&mut self, backend: &'static str, checker: F)
    where
        F: Fn(&(dyn StdError + 'static)) -> bool + Send + Sync + 'static,
    {
        self.checkers.push((backend, Box::new(checker)));
        debug!(backend, "Registered already-exists checker");
    }

    /// Returns `true` if any registered predicate matches `err`.
    #[must_use]
    pub fn classify(&self, err: &(dyn StdError + 'static)) -> bool {
        self.checkers.iter().any(|(_, checker)| checker(err))
    }

    /// Returns `true` if `err` wraps a backend error that any predicate matches.
    #[must_use]
    pub fn is_already_exists(&self, err: &StorageError) -> bool {
        match err.backend_source() {
            Some(source) => self.classify(source),
            None => false,
        }
    }

    /// Number of registered predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl fmt::Debug for AlreadyExistsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.checkers.iter().map(|(backend, _)| backend))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("duplicate key")]
    struct DuplicateKey;

    #[test]
    fn test_empty_registry_matches_nothing() {
        let registry = AlreadyExistsRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.classify(&DuplicateKey));
    }

    #[test]
    fn test_any_checker_matches() {
        let mut registry = AlreadyExistsRegistry::new();
        registry.register("never", |_| false);
        registry.register("dup", |err| err.downcast_ref::<DuplicateKey>().is_some());
        assert_eq!(registry.len(), 2);

        assert!(registry.classify(&DuplicateKey));
        assert!(!registry.classify(&std::io::Error::other("boom")));
    }

    #[test]
    fn test_storage_error_classification() {
        let mut registry = AlreadyExistsRegistry::new();
        registry.register("dup", |err| err.downcast_ref::<DuplicateKey>().is_some());

        assert!(registry.is_already_exists(&StorageError::backend(DuplicateKey)));
        assert!(!registry.is_already_exists(&StorageError::validation("dup")));
        assert!(!registry.is_already_exists(&StorageError::backend(std::io::Error::other("x"))));
    }

    #[test]
    fn test_debug_lists_backends() {
        let mut registry = AlreadyExistsRegistry::new();
        registry.register("postgres", |_| false);
        assert_eq!(format!("{registry:?}"), r#"["postgres"]"#);
    }
}
