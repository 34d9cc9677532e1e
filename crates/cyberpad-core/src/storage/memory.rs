//! In-memory key-value back end

use std::collections::BTreeMap;

use super::{check_key, utf16_len, KeyValueStore, StorageError, StorageResult};

/// Key-value store held in a map
///
/// An optional capacity models a browser's local-storage quota: it is
/// measured in bytes at two bytes per character of every key and value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    capacity: Option<u64>,
}

impl MemoryStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes beyond `capacity` bytes
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes charged against the capacity
    pub fn used_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|(k, v)| entry_bytes(k, v))
            .sum()
    }
}

fn entry_bytes(key: &str, value: &str) -> u64 {
    (utf16_len(key) + utf16_len(value)) * 2
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        check_key(key)?;

        if let Some(capacity) = self.capacity {
            let existing = self
                .entries
                .get(key)
                .map(|old| entry_bytes(key, old))
                .unwrap_or(0);
            let required = self.used_bytes() - existing + entry_bytes(key, value);
            if required > capacity {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    capacity,
                });
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let mut store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());

        store.set("alpha", "one").unwrap();
        store.set("alpha", "two").unwrap();
        assert_eq!(store.get("alpha").unwrap().as_deref(), Some("two"));
        assert_eq!(store.len(), 1);

        assert!(store.remove("alpha").unwrap());
        assert!(!store.remove("alpha").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_sorted() {
        let mut store = MemoryStore::new();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.set("", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_capacity_exceeded_keeps_old_value() {
        // "k" + 4 chars = 10 bytes fits, "k" + 10 chars = 22 bytes does not
        let mut store = MemoryStore::with_capacity(20);
        store.set("k", "abcd").unwrap();
        assert_eq!(store.used_bytes(), 10);

        let err = store.set("k", "0123456789").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                required: 22,
                capacity: 20,
                ..
            }
        ));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("abcd"));
    }

    #[test]
    fn test_capacity_replacing_frees_old_value() {
        let mut store = MemoryStore::with_capacity(20);
        store.set("k", "012345678").unwrap();
        // Replacing a value only charges the difference
        store.set("k", "abcdefghi").unwrap();
        assert_eq!(store.used_bytes(), 20);
    }
}
