//! Keyed in-flight guard.
//!
//! A key is held for as long as its [`InFlightGuard`] lives. Release is
//! structural: every exit path, including `?` and panics, drops the guard.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Keys = Arc<Mutex<HashSet<String>>>;

fn lock(keys: &Keys) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Set of keys with an operation in progress.
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    keys: Keys,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns `None` if it is already held.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard> {
        lock(&self.keys).insert(key.to_string()).then(|| InFlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.keys).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.keys).is_empty()
    }
}

/// Holds one key of an [`InFlightSet`]; releases it on drop.
#[derive(Debug)]
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    keys: Keys,
    key: String,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let set = InFlightSet::new();
        let guard = set.try_acquire("a").unwrap();
        assert_eq!(guard.key(), "a");
        assert!(set.try_acquire("a").is_none());
        assert!(set.try_acquire("b").is_some(), "other keys are independent");
    }

    #[test]
    fn test_drop_releases_key() {
        let set = InFlightSet::new();
        {
            let _guard = set.try_acquire("a").unwrap();
            assert!(set.contains("a"));
        }
        assert!(set.is_empty());
        assert!(set.try_acquire("a").is_some());
    }

    #[test]
    fn test_early_return_releases_key() {
        fn failing(set: &InFlightSet) -> Result<(), &'static str> {
            let _guard = set.try_acquire("a").ok_or("busy")?;
            Err("fetch failed")
        }

        let set = InFlightSet::new();
        assert_eq!(failing(&set), Err("fetch failed"));
        assert!(!set.contains("a"));
        assert_eq!(set.len(), 0);
    }
}
