//! Service configuration loaded from a TOML file.
//!
//! Every section and key is optional. A missing file yields the defaults,
//! command line flags are applied on top by the binary.

use fieldfuse_matcher::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Where table metadata and values come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub fields_url: Option<String>,
    pub data_url: Option<String>,
    /// JSON table dump served from memory when no URLs are configured.
    pub tables_path: Option<PathBuf>,
    /// Maximum number of values fetched per field.
    pub value_limit: Option<usize>,
    pub cache_tables: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            fields_url: None,
            data_url: None,
            tables_path: None,
            value_limit: None,
            cache_tables: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// Callback receiving result pages. Pages stay in memory when unset.
    pub result_url: Option<String>,
    pub page_size: usize,
    pub archive_dir: Option<PathBuf>,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            result_url: None,
            page_size: 100,
            archive_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub http_port: u16,
    /// Match worker threads.
    pub workers: usize,
    /// actix-web worker threads.
    pub http_workers: usize,
    pub data_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8000,
            workers: 2,
            http_workers: 2,
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    pub idf_path: Option<PathBuf>,
    pub gazetteer_path: Option<PathBuf>,
    pub embedding_dim: usize,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            idf_path: None,
            gazetteer_path: None,
            embedding_dim: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub matcher: MatcherConfig,
    pub catalog: CatalogSettings,
    pub sink: SinkSettings,
    pub server: ServerSettings,
    pub resources: ResourceSettings,
}

impl Settings {
    /// Read settings from `path`. A missing file is not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject combinations that would only fail later, inside a job.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.matcher
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        if self.catalog.fields_url.is_some() != self.catalog.data_url.is_some() {
            return Err(SettingsError::Invalid(
                "catalog.fields_url and catalog.data_url must be set together".to_string(),
            ));
        }
        if self.catalog.cache_tables == 0 {
            return Err(SettingsError::Invalid("catalog.cache_tables must be positive".to_string()));
        }
        if self.sink.page_size == 0 {
            return Err(SettingsError::Invalid("sink.page_size must be positive".to_string()));
        }
        if self.server.workers == 0 {
            return Err(SettingsError::Invalid("server.workers must be positive".to_string()));
        }
        if self.resources.embedding_dim == 0 {
            return Err(SettingsError::Invalid("resources.embedding_dim must be positive".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn remote_catalog(&self) -> Option<(&str, &str)> {
        match (&self.catalog.fields_url, &self.catalog.data_url) {
            (Some(fields), Some(data)) => Some((fields.as_str(), data.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(dir.path().join("none.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.server.http_port, 8000);
        assert_eq!(settings.sink.page_size, 100);
        assert_eq!(settings.catalog.cache_tables, 64);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::parse(
            r#"
            [matcher]
            punish = 2.0
            num_keywords = 10

            [catalog]
            fields_url = "http://catalog/fields"
            data_url = "http://catalog/data"
            value_limit = 500

            [server]
            workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(settings.matcher.punish, 2.0);
        assert_eq!(settings.matcher.num_keywords, 10);
        assert_eq!(settings.matcher.max_text_count, 2000);
        assert_eq!(settings.catalog.value_limit, Some(500));
        assert_eq!(
            settings.remote_catalog(),
            Some(("http://catalog/fields", "http://catalog/data"))
        );
        assert_eq!(settings.server.workers, 4);
        assert_eq!(settings.server.http_port, 8000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = Settings::default();
        settings.matcher.num_keywords = settings.matcher.max_text_count + 1;
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));

        let mut settings = Settings::default();
        settings.catalog.fields_url = Some("http://catalog/fields".to_string());
        assert!(settings.validate().is_err());
        assert!(settings.remote_catalog().is_none());

        let mut settings = Settings::default();
        settings.sink.page_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server]\nhttp_port = \"eighty\"\n").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse { .. })));
    }
}
