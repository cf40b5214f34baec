//! Registry of in-flight image loads keyed by request identity.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::domain::entities::RequestKey;

use super::pending_operation::PendingOperation;

/// Result of [`InFlightRegistry::lookup_or_create`].
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The operation now registered for the key.
    pub operation: Arc<PendingOperation>,
    /// True when the factory ran and the caller must drive the operation.
    pub created: bool,
}

/// Map from request key to the operation currently serving it.
///
/// The lock is only ever taken for synchronous map work and never held
/// across an `.await`.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<RequestKey, Arc<PendingOperation>>>,
}

impl InFlightRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key`, inserting `factory()` if there is none.
    /// The check and the insert happen under one lock acquisition.
    pub fn lookup_or_create<F>(&self, key: &RequestKey, factory: F) -> Lookup
    where
        F: FnOnce() -> PendingOperation,
    {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(key) {
            trace!(key = %key, "Joining in-flight load");
            return Lookup {
                operation: existing.clone(),
                created: false,
            };
        }

        let operation = Arc::new(factory());
        entries.insert(key.clone(), operation.clone());
        trace!(key = %key, in_flight = entries.len(), "Registered in-flight load");
        Lookup {
            operation,
            created: true,
        }
    }

    /// Removes the entry for `key`. No-op if absent.
    pub fn remove(&self, key: &RequestKey) -> Option<Arc<PendingOperation>> {
        self.entries.lock().remove(key)
    }

    /// Removes the entry for `key` only if it is still `operation`.
    /// Returns true when something was removed.
    pub fn remove_if_current(&self, key: &RequestKey, operation: &Arc<PendingOperation>) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(current) if Arc::ptr_eq(current, operation) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Returns true if `key` has an entry.
    #[must_use]
    pub fn contains(&self, key: &RequestKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Retries;

    fn key(uri: &str) -> RequestKey {
        RequestKey::build(uri, false, false, None)
    }

    #[test]
    fn test_lookup_or_create_returns_existing_entry() {
        let registry = InFlightRegistry::new();
        let k = key("a");

        let first = registry.lookup_or_create(&k, || PendingOperation::new(k.clone(), Retries::ONCE));
        let second = registry.lookup_or_create(&k, || {
            PendingOperation::new(k.clone(), Retries::DEFAULT)
        });

        assert!(first.created);
        assert!(!second.created);
        assert!(Arc::ptr_eq(&first.operation, &second.operation));
        assert_eq!(second.operation.retries(), Retries::ONCE);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_entries() {
        let registry = InFlightRegistry::new();
        let a = key("a");
        let b = key("b");

        registry.lookup_or_create(&a, || PendingOperation::new(a.clone(), Retries::ONCE));
        registry.lookup_or_create(&b, || PendingOperation::new(b.clone(), Retries::ONCE));

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let registry = InFlightRegistry::new();
        assert!(registry.remove(&key("missing")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_if_current_ignores_newer_entry() {
        let registry = InFlightRegistry::new();
        let k = key("a");

        let old = registry
            .lookup_or_create(&k, || PendingOperation::new(k.clone(), Retries::ONCE))
            .operation;
        registry.remove(&k);
        let newer = registry
            .lookup_or_create(&k, || PendingOperation::new(k.clone(), Retries::ONCE))
            .operation;

        assert!(!registry.remove_if_current(&k, &old));
        assert!(registry.contains(&k));
        assert!(registry.remove_if_current(&k, &newer));
        assert!(!registry.contains(&k));
    }
}
