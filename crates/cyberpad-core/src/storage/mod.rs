//! Storage layer
//!
//! A workspace blob lives in a flat key-value back end that behaves like a
//! browser's local storage: synchronous get/set/remove/enumerate over string
//! keys and values, with a finite capacity that writes can exceed.
//!
//! ## Back ends
//!
//! - [`MemoryStore`]: in-process map, used by tests and scratch sessions
//! - [`FileStore`]: one file per key in the data directory
//!
//! Sizes follow browser accounting: every stored character counts as two
//! bytes (one UTF-16 code unit).

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Number of UTF-16 code units in `s`, the unit browsers measure storage in
pub fn utf16_len(s: &str) -> u64 {
    s.encode_utf16().count() as u64
}

/// Synchronous string key-value substrate
pub trait KeyValueStore {
    /// Read a value; `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    ///
    /// On failure the previous value (if any) is left untouched.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a key, returning whether it existed
    fn remove(&mut self, key: &str) -> StorageResult<bool>;

    /// All keys currently stored
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Total number of stored value characters (UTF-16 code units)
    fn stored_chars(&self) -> StorageResult<u64> {
        let mut total = 0;
        for key in self.keys()? {
            if let Some(value) = self.get(&key)? {
                total += utf16_len(&value);
            }
        }
        Ok(total)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        (**self).remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }

    fn stored_chars(&self) -> StorageResult<u64> {
        (**self).stored_chars()
    }
}

/// Approximate space used by a back end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    /// Number of keys present
    pub keys: usize,
    /// Stored value characters
    pub chars: u64,
}

impl StorageUsage {
    /// Measure a back end
    pub fn measure<S: KeyValueStore + ?Sized>(store: &S) -> StorageResult<Self> {
        Ok(Self {
            keys: store.keys()?.len(),
            chars: store.stored_chars()?,
        })
    }

    /// Bytes, at two bytes per character
    pub fn bytes(&self) -> u64 {
        self.chars * 2
    }

    pub fn kilobytes(&self) -> f64 {
        self.bytes() as f64 / 1024.0
    }

    /// Human-readable size, e.g. `"12.34 KB"`
    pub fn human(&self) -> String {
        format!("{:.2} KB", self.kilobytes())
    }
}

/// Reject keys the back ends cannot address
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
