//! Key-value persistence back-ends
//!
//! The preset store only needs to read and write one named blob. A successful
//! `set` must be durable: a crash right after it returns cannot lose the write.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{MixerError, Result};

/// Named blob storage.
pub trait KeyValueStore {
    /// Read a blob, `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a blob, replacing any previous value.
    fn set(&mut self, key: &str, blob: &str) -> Result<()>;

    /// Copy the raw value of `from` to `to`. Returns whether `from` existed.
    fn copy(&mut self, from: &str, to: &str) -> Result<bool> {
        match self.get(from)? {
            Some(blob) => self.set(to, &blob).map(|()| true),
            None => Ok(false),
        }
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// One JSON file per key in a directory.
///
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|e| MixerError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let content = String::from_utf8(bytes).map_err(|e| MixerError::PresetDecode {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| MixerError::DirectoryCreate {
                path: self.dir.clone(),
                source: e,
            })?;
        }

        let path = self.path_for(key);
        let write_error = |e: std::io::Error| MixerError::FileWrite {
            path: path.clone(),
            source: e,
        };

        let mut file = NamedTempFile::new_in(&self.dir).map_err(write_error)?;
        file.write_all(blob.as_bytes()).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&path).map_err(|e| write_error(e.error))?;

        Ok(())
    }

    /// Byte-for-byte copy, so blobs that are not valid text survive too.
    fn copy(&mut self, from: &str, to: &str) -> Result<bool> {
        let source = self.path_for(from);
        if !source.exists() {
            return Ok(false);
        }

        let target = self.path_for(to);
        fs::copy(&source, &target).map_err(|e| MixerError::FileWrite {
            path: target.clone(),
            source: e,
        })?;
        Ok(true)
    }
}
