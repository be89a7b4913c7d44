//! YAML configuration for the embedsearch pipeline.
//!
//! One file describes the embedding strategy, the document store and the search target.
//! Every section is optional and falls back to its defaults.
//!
//! ```yaml
//! semantic:
//!   mode: remote                 # remote | local | stub
//!   model_name: text-embedding-ada-002
//!   api_timeout_secs: 30
//!   # api_key is usually left out and taken from OPENAI_API_KEY
//!
//! store:
//!   backend:
//!     kind: redb
//!     path: ./data/documents.redb
//!   compression:
//!     codec: zstd
//!     level: 3
//!   index_name: embeddings-index
//!   collection: documents
//!   vector_field: embedding
//!
//! search:
//!   candidate_count: 5
//! ```

use std::fs;
use std::path::Path;

use index::StoreConfig;
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retriever::SearchConfig;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub semantic: SemanticConfig,
    pub store: StoreConfig,
    /// Search target. The index, collection and field names default to the store's own;
    /// see [`PipelineConfig::search_config`].
    pub search: SearchSection,
}

/// Search settings as written in the config file; absent names follow the store section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub candidate_count: usize,
    pub index_name: Option<String>,
    pub collection: Option<String>,
    pub vector_field: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            candidate_count: crate::retriever::DEFAULT_CANDIDATE_COUNT,
            index_name: None,
            collection: None,
            vector_field: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill a missing API key from [`API_KEY_ENV`].
    pub fn with_env_api_key(mut self) -> Self {
        if self.semantic.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                self.semantic.api_key = Some(key);
            }
        }
        self
    }

    /// Effective search target after applying the store defaults.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            candidate_count: self.search.candidate_count,
            index_name: self
                .search
                .index_name
                .clone()
                .unwrap_or_else(|| self.store.index_name.clone()),
            collection: self
                .search
                .collection
                .clone()
                .unwrap_or_else(|| self.store.collection.clone()),
            vector_field: self
                .search
                .vector_field
                .clone()
                .unwrap_or_else(|| self.store.vector_field.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;

        if self.search.candidate_count == 0 {
            return Err(ConfigLoadError::Validation(
                "search.candidate_count must be >= 1".into(),
            ));
        }

        if self.search.candidate_count > self.store.ann.max_results {
            return Err(ConfigLoadError::Validation(format!(
                "search.candidate_count {} exceeds store.ann.max_results {}",
                self.search.candidate_count, self.store.ann.max_results
            )));
        }

        if self.store.vector_field.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "store.vector_field must not be empty".into(),
            ));
        }

        let search = self.search_config();
        for (name, searched, defined) in [
            ("index_name", &search.index_name, &self.store.index_name),
            ("collection", &search.collection, &self.store.collection),
            ("vector_field", &search.vector_field, &self.store.vector_field),
        ] {
            if searched != defined {
                return Err(ConfigLoadError::Validation(format!(
                    "search.{name} '{searched}' does not match store.{name} '{defined}'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::BackendConfig;
    use std::io::Write;

    #[test]
    fn load_valid_yaml() {
        let yaml = r#"
semantic:
  mode: stub
  stub_dimension: 64
store:
  backend:
    kind: redb
    path: /tmp/embedsearch.redb
search:
  candidate_count: 3
"#;
        let cfg = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.semantic.mode, "stub");
        assert_eq!(cfg.semantic.stub_dimension, 64);
        assert_eq!(cfg.store.backend, BackendConfig::redb("/tmp/embedsearch.redb"));

        let search = cfg.search_config();
        assert_eq!(search.candidate_count, 3);
        assert_eq!(search.index_name, "embeddings-index");
        assert_eq!(search.vector_field, "embedding");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "semantic:\n  mode: stub").unwrap();
        let cfg = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.semantic.mode, "stub");
        assert_eq!(cfg.store.backend, BackendConfig::InMemory);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PipelineConfig::from_file(dir.path().join("absent.yaml")),
            Err(ConfigLoadError::FileRead(_))
        ));
    }

    #[test]
    fn default_remote_without_key_is_invalid() {
        let cfg = PipelineConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigLoadError::Validation(_))));
    }

    #[test]
    fn zero_candidates_rejected() {
        let yaml = "semantic:\n  mode: stub\nsearch:\n  candidate_count: 0\n";
        assert!(matches!(
            PipelineConfig::from_yaml(yaml),
            Err(ConfigLoadError::Validation(msg)) if msg.contains("candidate_count")
        ));
    }

    #[test]
    fn candidates_beyond_index_limit_rejected() {
        let yaml = "semantic:\n  mode: stub\nsearch:\n  candidate_count: 101\n";
        assert!(matches!(
            PipelineConfig::from_yaml(yaml),
            Err(ConfigLoadError::Validation(msg)) if msg.contains("max_results")
        ));

        let yaml = "semantic:\n  mode: stub\nstore:\n  ann:\n    max_results: 200\nsearch:\n  candidate_count: 150\n";
        assert_eq!(PipelineConfig::from_yaml(yaml).unwrap().search.candidate_count, 150);
    }

    #[test]
    fn search_target_must_match_store() {
        let yaml = "semantic:\n  mode: stub\nsearch:\n  index_name: other-index\n";
        assert!(matches!(
            PipelineConfig::from_yaml(yaml),
            Err(ConfigLoadError::Validation(msg)) if msg.contains("index_name")
        ));
    }

    #[test]
    fn search_names_follow_store_overrides() {
        let yaml = "semantic:\n  mode: stub\nstore:\n  vector_field: vec\n";
        let cfg = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.search_config().vector_field, "vec");
    }

    #[test]
    fn invalid_yaml_is_parse_error() {
        assert!(matches!(
            PipelineConfig::from_yaml("semantic: [unclosed"),
            Err(ConfigLoadError::YamlParse(_))
        ));
    }

    #[test]
    fn explicit_api_key_is_kept() {
        let mut cfg = PipelineConfig::default();
        cfg.semantic.api_key = Some("sk-explicit".into());
        let cfg = cfg.with_env_api_key();
        assert_eq!(cfg.semantic.api_key.as_deref(), Some("sk-explicit"));
    }
}
