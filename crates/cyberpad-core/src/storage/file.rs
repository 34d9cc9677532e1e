//! File-backed key-value store
//!
//! Each key is stored as its own file in a single directory. File names are
//! the URL-safe base64 encoding of the key, so any key (including identities
//! with path separators) maps to exactly one file and never collides with
//! another key.
//!
//! Keys whose encoding would not fit in a file name are stored under
//! `~<sha256 hex>.kv` instead. Such files start with the encoded key on its
//! own line, followed by the value, so `keys()` can still recover them.
//!
//! The capacity is measured like a browser quota: two bytes per UTF-16 code
//! unit of every stored value.
//!
//! Writes are atomic (write to a temp file, sync, rename) so a reader never
//! observes a partially written value.
//!
//! Storage location: `~/.local/share/cyberpad/store/` (configurable via `Config`)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{check_key, utf16_len, KeyValueStore, StorageError, StorageResult};

/// Extension of value files
const VALUE_EXTENSION: &str = "kv";

/// Longest encoded key used directly as a file stem
///
/// Leaves room for the extension under the common 255-byte name limit.
const MAX_ENCODED_STEM: usize = 200;

/// Stem prefix of files named by key digest; not in the base64 alphabet
const HASHED_PREFIX: char = '~';

/// Key-value store kept in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    /// Maximum total size of all values, in bytes at two per UTF-16 unit
    capacity: Option<u64>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            capacity: None,
        })
    }

    /// Limit the total size of stored values
    pub fn with_capacity(mut self, capacity: Option<u64>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> Option<u64> {
        self.capacity
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let encoded = URL_SAFE_NO_PAD.encode(key);
        let stem = if encoded.len() <= MAX_ENCODED_STEM {
            encoded
        } else {
            format!("{}{}", HASHED_PREFIX, hex::encode(Sha256::digest(key.as_bytes())))
        };
        self.dir.join(format!("{}.{}", stem, VALUE_EXTENSION))
    }

    /// Stored characters of all values except the one in `skip`
    fn used_chars_excluding(&self, skip: Option<&Path>) -> StorageResult<u64> {
        let mut total = 0;
        for path in self.value_files()? {
            if Some(path.as_path()) == skip {
                continue;
            }
            let (_, value) = read_entry(&path)?;
            total += utf16_len(&value);
        }
        Ok(total)
    }

    fn value_files(&self) -> StorageResult<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| StorageError::from_read_io(e, self.dir.clone()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(VALUE_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_hashed(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.starts_with(HASHED_PREFIX))
}

fn decode(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

/// Split a value file into the key from its header (digest-named files
/// only) and the value
fn split_entry(path: &Path, contents: String) -> (Option<String>, String) {
    if !is_hashed(path) {
        return (None, contents);
    }
    match contents.split_once('\n') {
        Some((header, value)) => (decode(header), value.to_string()),
        None => (None, String::new()),
    }
}

fn read_entry(path: &Path) -> StorageResult<(Option<String>, String)> {
    let contents =
        fs::read_to_string(path).map_err(|e| StorageError::from_read_io(e, path.to_path_buf()))?;
    Ok(split_entry(path, contents))
}

/// Recover the key of a value file
fn decode_key(path: &Path) -> Option<String> {
    if is_hashed(path) {
        return read_entry(path).ok()?.0;
    }
    decode(path.file_stem()?.to_str()?)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        check_key(key)?;
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_read_io(e, path)),
        };
        match split_entry(&path, contents) {
            // Digest collision with a different key
            (Some(stored), _) if stored != key => Ok(None),
            (_, value) => Ok(Some(value)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        check_key(key)?;
        let path = self.path_for(key);

        if let Some(capacity) = self.capacity {
            let required = (self.used_chars_excluding(Some(&path))? + utf16_len(value)) * 2;
            if required > capacity {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    capacity,
                });
            }
        }

        if is_hashed(&path) {
            let contents = format!("{}\n{}", URL_SAFE_NO_PAD.encode(key), value);
            atomic_write(&path, contents.as_bytes())?;
        } else {
            atomic_write(&path, value.as_bytes())?;
        }
        debug!(key, bytes = value.len(), "Wrote value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_io(e, path)),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for path in self.value_files()? {
            match decode_key(&path) {
                Some(key) => keys.push(key),
                None => debug!(?path, "Skipping file with undecodable name"),
            }
        }
        Ok(keys)
    }

    fn stored_chars(&self) -> StorageResult<u64> {
        self.used_chars_excluding(None)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let write_temp = || -> io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()
    };
    if let Err(e) = write_temp() {
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::from_io(e, temp_path));
    }

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })
}
