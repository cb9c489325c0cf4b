//! Store configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::storage::MAX_IMPORT_WORKERS;

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile, process-local store.
    #[default]
    #[serde(alias = "mem")]
    Memory,
    /// Store persisted to a JSON file.
    File,
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(StoreError::config(format!(
                "unknown store backend '{other}' (expected memory or file)"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::File => "file",
        })
    }
}

/// Configuration for [`open_store`](crate::open_store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend to open.
    pub backend: BackendKind,
    /// Store file; required for [`BackendKind::File`].
    pub path: Option<PathBuf>,
    /// Worker threads per bulk import (1 to [`MAX_IMPORT_WORKERS`]).
    pub import_workers: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            path: None,
            import_workers: MAX_IMPORT_WORKERS,
        }
    }
}

impl StoreConfig {
    /// In-memory store with default settings.
    #[must_use]
    pub fn memory() -> Self {
        Self::default()
    }

    /// File-backed store at `path` with default settings.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Reads a configuration file. Missing keys take their defaults.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, anything else
    /// as JSON. The result is not validated; [`open_store`](crate::open_store)
    /// does that.
    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let invalid = |e: &dyn fmt::Display| {
            StoreError::config(format!("invalid config file {}: {e}", path.display()))
        };
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_slice(&bytes).map_err(|e| invalid(&e)),
            _ => serde_json::from_slice(&bytes).map_err(|e| invalid(&e)),
        }
    }

    /// Checks the configuration, returning it unchanged if valid.
    pub fn validate(self) -> StoreResult<Self> {
        if self.backend == BackendKind::File && self.path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
            return Err(StoreError::config("file backend requires a non-empty path"));
        }

        if !(1..=MAX_IMPORT_WORKERS).contains(&self.import_workers) {
            return Err(StoreError::config(format!(
                "import_workers must be between 1 and {MAX_IMPORT_WORKERS} (got {})",
                self.import_workers
            )));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn parses_backend_names() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!(" MEM ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("file".parse::<BackendKind>().unwrap(), BackendKind::File);
        assert!("sqlite".parse::<BackendKind>().unwrap_err().to_string().contains("sqlite"));
    }

    #[test]
    fn validation_rules() {
        assert!(StoreConfig::memory().validate().is_ok());
        assert!(StoreConfig::file("data/products.json").validate().is_ok());
        assert!(StoreConfig::file("").validate().is_err());

        let mut cfg = StoreConfig::memory();
        cfg.import_workers = 0;
        assert!(cfg.clone().validate().is_err());
        cfg.import_workers = MAX_IMPORT_WORKERS + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_json_file_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, r#"{"backend": "file", "path": "/tmp/p.json"}"#).unwrap();

        let cfg = StoreConfig::from_file(&path).unwrap();
        assert_eq!(cfg.backend, BackendKind::File);
        assert_eq!(cfg.path.as_deref(), Some(Path::new("/tmp/p.json")));
        assert_eq!(cfg.import_workers, MAX_IMPORT_WORKERS);

        std::fs::write(&path, r#"{"backend": "tape"}"#).unwrap();
        assert!(StoreConfig::from_file(&path).unwrap_err().kind() == crate::ErrorKind::Config);
    }

    #[test]
    fn reads_yaml_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.yaml");
        std::fs::write(&path, "backend: mem\nimport_workers: 3\n").unwrap();

        let cfg = StoreConfig::from_file(&path).unwrap();
        assert_eq!(cfg.backend, BackendKind::Memory);
        assert_eq!(cfg.import_workers, 3);

        std::fs::write(&path, "backend: file\nbogus: 1\n").unwrap();
        assert_eq!(StoreConfig::from_file(&path).unwrap_err().kind(), crate::ErrorKind::Config);
    }
}
