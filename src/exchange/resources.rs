use std::fs;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Result, TreeportError};

/// Hash bytes directly using SHA-256.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn format_hash(hash: &[u8; 32]) -> String {
    hex::encode(hash)
}

/// Content-addressed file name: `<sha256>` plus the lowercased extension
/// of `original_filename`, if it has one.
pub fn content_filename(content: &[u8], original_filename: &str) -> String {
    let hash = format_hash(&hash_bytes(content));
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}.{}", hash, ext.to_ascii_lowercase()),
        None => hash,
    }
}

/// Binary resources stored next to an export document.
pub struct ResourceStore {
    dir: PathBuf,
    files_written: usize,
}

impl ResourceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ResourceStore {
            dir: dir.into(),
            files_written: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files this store created (reused files are not counted).
    pub fn files_written(&self) -> usize {
        self.files_written
    }

    /// Write `content` unless a file with the same content name exists.
    /// Returns the name relative to the resources directory.
    pub fn store(&mut self, content: &[u8], original_filename: &str) -> Result<String> {
        let name = content_filename(content, original_filename);
        let path = self.dir.join(&name);

        if !path.exists() {
            fs::create_dir_all(&self.dir)?;
            fs::write(&path, content)?;
            self.files_written += 1;
        }

        Ok(name)
    }

    /// Read a resource back, verifying its digest when the name carries one.
    pub fn load(&self, name: &str) -> Result<Vec<u8>> {
        let mut components = Path::new(name).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single {
            return Err(TreeportError::ResourceMissing {
                path: self.dir.join(name),
            });
        }

        if !self.dir.is_dir() {
            return Err(TreeportError::ResourceMissing {
                path: self.dir.clone(),
            });
        }

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(TreeportError::ResourceMissing { path });
        }

        let bytes = fs::read(&path)?;

        let stem = name.split('.').next().unwrap_or_default();
        if stem.len() == 64 && stem.chars().all(|c| c.is_ascii_hexdigit()) {
            let actual = format_hash(&hash_bytes(&bytes));
            if !actual.eq_ignore_ascii_case(stem) {
                return Err(TreeportError::ChecksumMismatch {
                    path,
                    expected: stem.to_string(),
                    actual,
                });
            }
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_known_value() {
        // SHA-256 of empty input
        assert_eq!(
            format_hash(&hash_bytes(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_content_filename_keeps_extension() {
        let name = content_filename(b"", "Photo.PNG");
        assert_eq!(
            name,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855.png"
        );
        assert_eq!(content_filename(b"", "README").len(), 64);
        assert_eq!(content_filename(b"", "weird.ex t").len(), 64);
    }

    #[test]
    fn test_directory_created_lazily() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("Resources");
        let mut store = ResourceStore::new(&dir);
        assert!(!dir.exists());

        store.store(b"hello", "a.txt").unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_identical_content_stored_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = ResourceStore::new(temp_dir.path().join("Resources"));

        let a = store.store(b"same bytes", "first.jpg").unwrap();
        let b = store.store(b"same bytes", "second.jpg").unwrap();
        let c = store.store(b"other bytes", "third.jpg").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.files_written(), 2);
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 2);
    }

    #[test]
    fn test_load_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = ResourceStore::new(temp_dir.path().join("Resources"));
        let name = store.store(b"\x00\x01binary", "blob.bin").unwrap();

        assert_eq!(store.load(&name).unwrap(), b"\x00\x01binary");
    }

    #[test]
    fn test_load_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ResourceStore::new(temp_dir.path().join("Resources"));
        match store.load("a.png") {
            Err(TreeportError::ResourceMissing { path }) => {
                assert_eq!(path, temp_dir.path().join("Resources"))
            }
            other => panic!("Expected ResourceMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = ResourceStore::new(temp_dir.path().join("Resources"));
        store.store(b"x", "x.txt").unwrap();

        assert!(matches!(
            store.load("nothere.png"),
            Err(TreeportError::ResourceMissing { .. })
        ));
    }

    #[test]
    fn test_load_rejects_traversal() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();
        let mut store = ResourceStore::new(temp_dir.path().join("Resources"));
        store.store(b"x", "x.txt").unwrap();

        assert!(store.load("../secret.txt").is_err());
        assert!(store.load("/etc/passwd").is_err());
        assert!(store.load("").is_err());
    }

    #[test]
    fn test_load_detects_corruption() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = ResourceStore::new(temp_dir.path().join("Resources"));
        let name = store.store(b"original", "a.bin").unwrap();
        fs::write(store.dir().join(&name), b"tampered").unwrap();

        match store.load(&name) {
            Err(TreeportError::ChecksumMismatch { expected, .. }) => {
                assert!(name.starts_with(&expected))
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }
}
