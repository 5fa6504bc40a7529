#![forbid(unsafe_code)]

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Startup configuration. Resolving it is fatal when it fails; nothing
/// here is a per-request concern.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub storage_dir: PathBuf,
    #[serde(default)]
    pub db_file: Option<String>,
}

impl Config {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            db_file: None,
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStorageDir);
        }
        if let Some(db_file) = &self.db_file {
            if db_file.trim().is_empty() {
                return Err(ConfigError::EmptyDbFile);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    EmptyStorageDir,
    EmptyDbFile,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Parse(err) => write!(f, "config parse: {err}"),
            Self::EmptyStorageDir => write!(f, "config: storage_dir must not be empty"),
            Self::EmptyDbFile => write!(f, "config: db_file must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let config = Config::from_yaml("storage_dir: /tmp/tagtree\n").expect("parse config");
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/tagtree"));
        assert_eq!(config.db_file, None);
    }

    #[test]
    fn parses_db_file_override() {
        let config =
            Config::from_yaml("storage_dir: data\ndb_file: cats.db\n").expect("parse config");
        assert_eq!(config.db_file.as_deref(), Some("cats.db"));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Config::from_yaml("storage_dir: data\nbogus: 1\n").is_err());
    }

    #[test]
    fn rejects_empty_storage_dir() {
        assert!(matches!(
            Config::from_yaml("storage_dir: \"\"\n"),
            Err(ConfigError::EmptyStorageDir)
        ));
    }
}
