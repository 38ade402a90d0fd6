//! Directory configuration loaded from a JSON file.
//!
//! # Invariants
//! - Every field has a default, so `{}` is a valid configuration.
//! - A selected backend must carry the location it needs.

use crate::logging::default_log_level;
use crate::storage::BackendKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Session configuration for one directory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub backend: BackendKind,
    /// Root of the file-tree backend.
    pub data_dir: Option<PathBuf>,
    /// Location of the remote table store.
    pub remote_db_path: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::KeyValue,
            data_dir: None,
            remote_db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl DirectoryConfig {
    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            BackendKind::FileTree if self.data_dir.is_none() => Err(ConfigError::Invalid(
                "file_tree backend requires `data_dir`".to_string(),
            )),
            BackendKind::Remote if self.remote_db_path.is_none() => Err(ConfigError::Invalid(
                "remote backend requires `remote_db_path`".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DirectoryConfig};
    use crate::storage::BackendKind;
    use std::path::PathBuf;

    #[test]
    fn empty_object_uses_defaults() {
        let config = DirectoryConfig::from_json("{}").expect("empty config should parse");
        assert_eq!(config, DirectoryConfig::default());
        assert_eq!(config.backend, BackendKind::KeyValue);
    }

    #[test]
    fn parses_file_tree_backend() {
        let config =
            DirectoryConfig::from_json(r#"{"backend":"file_tree","data_dir":"/tmp/people"}"#)
                .expect("file tree config should parse");
        assert_eq!(config.backend, BackendKind::FileTree);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/people")));
    }

    #[test]
    fn rejects_backend_without_location() {
        let err = DirectoryConfig::from_json(r#"{"backend":"remote"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DirectoryConfig::from_json(r#"{"backend":"cloud"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
