//! Configuration, persisted as TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration against a local Ollama and a
//! `./trirag-data` artifact directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriragConfig {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub materialize: MaterializeConfig,
    pub batch: BatchConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: ProviderConfig,
    pub generation: ProviderConfig,
}

impl TriragConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.batch.chunk_size == 0 {
            return invalid("batch.chunk_size must be at least 1");
        }
        if self.batch.max_attempts == 0 {
            return invalid("batch.max_attempts must be at least 1");
        }
        if self.batch.parallelism == 0 {
            return invalid("batch.parallelism must be at least 1");
        }
        if self.retrieval.k == 0 {
            return invalid("retrieval.k must be at least 1");
        }
        if self.index.max_nb_connection == 0 || self.index.ef_construction == 0 {
            return invalid("index.max_nb_connection and index.ef_construction must be positive");
        }
        for ns in [
            &self.materialize.entity_namespace,
            &self.materialize.ontology_namespace,
        ] {
            if !ns.contains("://") {
                return invalid("materialize namespaces must be absolute IRIs");
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Json,
    Csv,
}

/// `[source]`: where rows come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            path: default_source_path(),
        }
    }
}

fn default_source_kind() -> SourceKind {
    SourceKind::Json
}
fn default_source_path() -> PathBuf {
    PathBuf::from("data.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Fs,
    Redb,
}

/// `[store]`: where artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_kind")]
    pub kind: StoreKind,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            path: default_store_path(),
        }
    }
}

fn default_store_kind() -> StoreKind {
    StoreKind::Fs
}
fn default_store_path() -> PathBuf {
    PathBuf::from("trirag-data")
}

/// `[embedding]` / `[generation]`: an Ollama endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name; empty selects the per-role default.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_timeout_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// `[materialize]`: how rows become triples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializeConfig {
    /// Prefix of subject IRIs: `<entity_namespace>/<table>/<row-id>`.
    #[serde(default = "default_entity_namespace")]
    pub entity_namespace: String,
    /// Prefix of predicate IRIs: `<ontology_namespace>/<field>`.
    #[serde(default = "default_ontology_namespace")]
    pub ontology_namespace: String,
    /// Field holding the row identifier.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Reference fields: field name → target table. Values become IRIs.
    #[serde(default)]
    pub references: BTreeMap<String, String>,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            entity_namespace: default_entity_namespace(),
            ontology_namespace: default_ontology_namespace(),
            id_field: default_id_field(),
            references: BTreeMap::new(),
        }
    }
}

fn default_entity_namespace() -> String {
    "http://example.org/bigquery".into()
}
fn default_ontology_namespace() -> String {
    "http://example.org/ontology".into()
}
fn default_id_field() -> String {
    "id".into()
}

/// `[batch]`: chunking and retry policy for embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Attempts per chunk, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Chunks embedded concurrently. 1 = sequential.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl BatchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_chunk_size() -> usize {
    50
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    5_000
}
fn default_parallelism() -> usize {
    1
}

/// `[index]`: HNSW construction parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_max_nb_connection")]
    pub max_nb_connection: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_nb_connection: default_max_nb_connection(),
            ef_construction: default_ef_construction(),
        }
    }
}

fn default_max_nb_connection() -> usize {
    16
}
fn default_ef_construction() -> usize {
    200
}

/// `[retrieval]`: query-time behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Neighbours fetched per query.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Relation local names followed during expansion (case-insensitive).
    #[serde(default = "default_relations")]
    pub relations: Vec<String>,
    /// Upper bound on retrieval time, excluding generation.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    /// Context prepended to every generation prompt.
    #[serde(default)]
    pub preamble: String,
    /// Returned instead of an answer when data is insufficient.
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

impl RetrievalConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            relations: default_relations(),
            deadline_ms: None,
            preamble: String::new(),
            fallback_message: default_fallback_message(),
        }
    }
}

fn default_k() -> usize {
    15
}
fn default_relations() -> Vec<String> {
    vec!["influencedby".into(), "partof".into()]
}
fn default_fallback_message() -> String {
    "I don't have enough data to answer that. Please call 1091 for immediate help.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: TriragConfig = toml::from_str("").unwrap();
        assert_eq!(config.batch.chunk_size, 50);
        assert_eq!(config.batch.max_attempts, 3);
        assert_eq!(config.batch.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.retrieval.k, 15);
        assert_eq!(config.retrieval.relations, vec!["influencedby", "partof"]);
        assert_eq!(config.index.max_nb_connection, 16);
        assert_eq!(config.index.ef_construction, 200);
        assert_eq!(config.materialize.id_field, "id");
        config.validate().unwrap();
    }

    #[test]
    fn sections_override_individual_fields() {
        let config: TriragConfig = toml::from_str(
            r#"
            [source]
            kind = "csv"
            path = "tables"

            [batch]
            chunk_size = 8
            parallelism = 4

            [materialize.references]
            station_id = "police_stations"
            "#,
        )
        .unwrap();
        assert_eq!(config.source.kind, SourceKind::Csv);
        assert_eq!(config.batch.chunk_size, 8);
        assert_eq!(config.batch.max_attempts, 3);
        assert_eq!(config.batch.parallelism, 4);
        assert_eq!(
            config.materialize.references.get("station_id").map(String::as_str),
            Some("police_stations")
        );
    }

    #[test]
    fn zero_chunk_size_is_invalid() {
        let mut config = TriragConfig::default();
        config.batch.chunk_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn relative_namespace_is_invalid() {
        let mut config = TriragConfig::default();
        config.materialize.entity_namespace = "entities".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trirag.toml");
        std::fs::write(&path, "[batch\nchunk_size = 1").unwrap();
        match TriragConfig::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert!(p.ends_with("trirag.toml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
