//! File-backed key-value store
//!
//! Each key is stored as `<dir>/<key>.json`. Writes go to a temporary file
//! in the same directory followed by a rename, so a crash mid-write leaves
//! either the old or the new value, never a truncated one.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lifesync_core::ports::IKeyValueStore;
use tracing::debug;

use crate::{validate_key, StoreError};

/// Extension appended to every key file
const VALUE_EXTENSION: &str = "json";

/// Key-value store persisted as one file per key
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Opens (and creates if needed) a store rooted at `dir`
    ///
    /// # Errors
    /// Returns [`StoreError::DirectoryUnavailable`] if `dir` exists and is
    /// not a directory, or an I/O error if it cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if dir.exists() && !dir.is_dir() {
            return Err(StoreError::DirectoryUnavailable(dir));
        }
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file key-value store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{VALUE_EXTENSION}")))
    }

    fn read_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::CorruptValue(key.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let target = self.path_for(key)?;
        let tmp_path = {
            let mut p = target.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };

        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &target)?;

        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove_value(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl IKeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read_value(key)?)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        Ok(self.write_value(key, value)?)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        Ok(self.remove_value(key)?)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        let store = FileKeyValueStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn test_open_rejects_file_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        assert!(matches!(
            FileKeyValueStore::open(&file),
            Err(StoreError::DirectoryUnavailable(_))
        ));
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(tmp.path()).unwrap();

        store.set("snap", "{}").unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["snap.json".to_string()]);
    }

    #[test]
    fn test_corrupt_value_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FileKeyValueStore::open(tmp.path()).unwrap();
        fs::write(tmp.path().join("bad.json"), [0xff, 0xfe]).unwrap();
        assert!(store.get("bad").is_err());
    }
}
