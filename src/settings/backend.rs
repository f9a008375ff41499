use dashmap::DashMap;
use std::path::{Path, PathBuf};

use crate::errors::{StorageError, StorageResult};

/// Opaque key-value backing store for settings blobs
pub trait SettingsBackend: Send + Sync {
    /// Read the blob stored under `key`, `None` if absent
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`
    fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Delete the blob stored under `key`; absent keys are not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Keys become file names, so only a conservative alphabet is accepted
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// In-memory backend, used by tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemorySettingsBackend {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemorySettingsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl SettingsBackend for MemorySettingsBackend {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.blobs.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash never leaves a half-written blob behind.
#[derive(Debug, Clone)]
pub struct FileSettingsBackend {
    dir: PathBuf,
}

impl FileSettingsBackend {
    /// Create the backend, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsBackend for FileSettingsBackend {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));

        std::fs::write(&tmp, bytes).map_err(|source| StorageError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("0b6f2c1e-5a7d-4a43-9c3e-1f2d3c4b5a69").is_ok());
        assert!(validate_key("_registry").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("with space").is_err());
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemorySettingsBackend::new();
        assert!(backend.read("a").unwrap().is_none());

        backend.write("a", b"{}").unwrap();
        assert_eq!(backend.read("a").unwrap().as_deref(), Some(&b"{}"[..]));
        assert_eq!(backend.len(), 1);

        backend.remove("a").unwrap();
        backend.remove("a").unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_file_backend_roundtrip() {
        let dir = TempDir::new().unwrap();
        let backend = FileSettingsBackend::new(dir.path().join("settings")).unwrap();

        assert!(backend.read("svc").unwrap().is_none());
        backend.write("svc", br#"{"voice":"x"}"#).unwrap();
        backend.write("svc", br#"{"voice":"y"}"#).unwrap();

        let bytes = backend.read("svc").unwrap().unwrap();
        assert_eq!(bytes, br#"{"voice":"y"}"#);
        assert!(!backend.dir().join("svc.json.tmp").exists());

        backend.remove("svc").unwrap();
        assert!(backend.read("svc").unwrap().is_none());
    }

    #[test]
    fn test_file_backend_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = FileSettingsBackend::new(dir.path()).unwrap();
        assert!(matches!(
            backend.write("../x", b"{}"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
