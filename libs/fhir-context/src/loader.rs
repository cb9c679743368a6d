//! Source payload loaders: resolve a logical location to raw bytes

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait PayloadLoader: Send + Sync {
    fn load(&self, location: &str) -> Result<Vec<u8>>;
}

/// Reads payloads relative to a root directory.
///
/// Locations always use `/` as separator; `\` is accepted and normalized.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let normalized = location.replace('\\', "/");
        normalized
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl PayloadLoader for FileSystemLoader {
    fn load(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location);
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::PayloadNotFound(location.to_string()),
            _ => Error::IoError(e),
        })
    }
}

/// Payloads held in memory, keyed by location
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    payloads: HashMap<String, Vec<u8>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        self.insert(location, payload);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.payloads
            .insert(location.into().replace('\\', "/"), payload.into());
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.payloads.keys().map(String::as_str)
    }
}

impl PayloadLoader for InMemoryLoader {
    fn load(&self, location: &str) -> Result<Vec<u8>> {
        self.payloads
            .get(&location.replace('\\', "/"))
            .cloned()
            .ok_or_else(|| Error::PayloadNotFound(location.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_loader_normalizes_separators() {
        let loader = InMemoryLoader::new().with("fhir\\erp\\Task.json", "{}");
        assert_eq!(loader.load("fhir/erp/Task.json").unwrap(), b"{}");
        assert_eq!(loader.load("fhir\\erp\\Task.json").unwrap(), b"{}");
        assert!(matches!(
            loader.load("fhir/erp/Other.json"),
            Err(Error::PayloadNotFound(_))
        ));
    }

    #[test]
    fn test_file_system_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("erp")).unwrap();
        std::fs::write(dir.path().join("erp").join("cs.json"), b"{\"a\":1}").unwrap();

        let loader = FileSystemLoader::new(dir.path());
        assert_eq!(loader.load("erp/cs.json").unwrap(), b"{\"a\":1}");
        assert_eq!(loader.load("erp\\cs.json").unwrap(), b"{\"a\":1}");
        assert!(matches!(
            loader.load("erp/missing.json"),
            Err(Error::PayloadNotFound(_))
        ));
    }
}
