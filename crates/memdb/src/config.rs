use std::path::Path;

use memdb_fs::{FsError, SyncMode};
use serde::{Deserialize, Serialize};

use crate::error::{MemDbError, MemDbResult};

/// Layout of the JSON document written for a root bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Single-line JSON, no insignificant whitespace.
    #[default]
    Compact,
    /// Indented JSON, easier to inspect by hand.
    Pretty,
}

/// Configuration for a [`MemDb`](crate::MemDb) handle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemDbConfig {
    /// Document layout used by `write`.
    pub format: DocumentFormat,
    /// Sync strategy for the OS file-system backend.
    pub sync_mode: SyncMode,
}

impl MemDbConfig {
    /// A configuration that fsyncs every write and pretty-prints documents.
    pub fn durable_pretty() -> Self {
        Self {
            format: DocumentFormat::Pretty,
            sync_mode: SyncMode::EveryWrite,
        }
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> MemDbResult<Self> {
        toml::from_str(s).map_err(|e| MemDbError::Config(e.to_string()))
    }

    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> MemDbResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FsError::from_io(path, e))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = MemDbConfig::default();
        assert_eq!(c.format, DocumentFormat::Compact);
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn parse_full_toml() {
        let c = MemDbConfig::from_toml_str(
            r#"
            format = "pretty"
            sync_mode = "every_write"
            "#,
        )
        .unwrap();
        assert_eq!(c, MemDbConfig::durable_pretty());
    }

    #[test]
    fn parse_partial_toml_uses_defaults() {
        let c = MemDbConfig::from_toml_str(r#"format = "pretty""#).unwrap();
        assert_eq!(c.format, DocumentFormat::Pretty);
        assert_eq!(c.sync_mode, SyncMode::OsDefault);

        let empty = MemDbConfig::from_toml_str("").unwrap();
        assert_eq!(empty, MemDbConfig::default());
    }

    #[test]
    fn parse_rejects_unknown_variant() {
        let result = MemDbConfig::from_toml_str(r#"format = "yaml""#);
        assert!(matches!(result, Err(MemDbError::Config(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memdb.toml");
        std::fs::write(&path, "sync_mode = \"every_write\"\n").unwrap();

        let c = MemDbConfig::load(&path).unwrap();
        assert_eq!(c.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.format, DocumentFormat::Compact);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MemDbConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(MemDbError::Io(FsError::NotFound(_)))));
    }
}
