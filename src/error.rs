//! Rich diagnostic error types for trirag.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so operators know exactly
//! which stage of the build or which query step failed.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for trirag.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum TriragError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("failed to read source {path}")]
    #[diagnostic(
        code(trirag::source::io),
        help("Check that the source path exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed source {path}: {message}")]
    #[diagnostic(
        code(trirag::source::parse),
        help(
            "JSON sources must be an object of `table -> [row objects]`; \
             CSV sources need a header row naming the fields."
        )
    )]
    Parse { path: String, message: String },

    #[error("table not found: {table}")]
    #[diagnostic(
        code(trirag::source::table_not_found),
        help("List the available tables with `RowSource::tables()`.")
    )]
    TableNotFound { table: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("invalid IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(trirag::graph::invalid_iri),
        help(
            "Subjects, predicates and URI objects must be absolute IRIs. \
             Check the entity and ontology namespaces in the [materialize] config."
        )
    )]
    InvalidIri { iri: String, message: String },

    #[error("failed to serialize graph document: {message}")]
    #[diagnostic(code(trirag::graph::serialize))]
    Serialize { message: String },

    #[error("failed to parse graph document: {message}")]
    #[diagnostic(
        code(trirag::graph::parse),
        help("The graph document is not valid Turtle. Rebuild the index.")
    )]
    Parse { message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(trirag::store::io),
        help(
            "A filesystem operation failed. Check that the store directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(trirag::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Try a fresh store file and rebuild the index."
        )
    )]
    Redb { message: String },

    #[error("key not found: {key}")]
    #[diagnostic(
        code(trirag::store::not_found),
        help("The requested blob does not exist. Run `trirag build` first.")
    )]
    NotFound { key: String },
}

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Failures reported by the embedding or generative provider.
///
/// At build time both variants are retried under the batch policy; at query
/// time they surface immediately.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ProviderError {
    #[error("provider request timed out: {message}")]
    #[diagnostic(
        code(trirag::provider::timeout),
        help("Increase `timeout_secs` for the provider or use a smaller model.")
    )]
    Timeout { message: String },

    #[error("provider request failed: {message}")]
    #[diagnostic(
        code(trirag::provider::failure),
        help("Check that the provider is running and the model is pulled.")
    )]
    Failure { message: String },
}

impl ProviderError {
    /// Whether this failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

// ---------------------------------------------------------------------------
// Index build errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("dimension mismatch at position {position}: expected {expected}, got {actual}")]
    #[diagnostic(
        code(trirag::index::dim_mismatch),
        help(
            "The embedding provider returned vectors of inconsistent length. \
             Every vector in one index must share a dimension; check that the \
             model did not change mid-run."
        )
    )]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{triples} triples but {outcomes} embedding outcomes")]
    #[diagnostic(
        code(trirag::index::misaligned),
        help("Triples and embedding outcomes must be positionally aligned.")
    )]
    Misaligned { triples: usize, outcomes: usize },

    #[error("failed to persist artifact `{artifact}`")]
    #[diagnostic(
        code(trirag::index::persistence),
        help(
            "Artifacts written before this failure are untrusted. \
             Fix the store and rerun the build; the loader will refuse partial sets."
        )
    )]
    Persistence {
        artifact: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode artifact `{artifact}`: {message}")]
    #[diagnostic(code(trirag::index::encode))]
    Encode {
        artifact: &'static str,
        message: String,
    },

    #[error("failed to start embedding worker pool: {message}")]
    #[diagnostic(
        code(trirag::index::worker_pool),
        help("Lower `parallelism` in the [batch] config.")
    )]
    WorkerPool { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Index load errors
// ---------------------------------------------------------------------------

/// The persisted artifacts cannot be served.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("artifact `{artifact}` is unavailable")]
    #[diagnostic(
        code(trirag::load::missing),
        help("Run `trirag build` to produce a complete artifact set.")
    )]
    Missing {
        artifact: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("artifact `{artifact}` could not be decoded: {message}")]
    #[diagnostic(
        code(trirag::load::decode),
        help("The artifact is corrupt or was written by an incompatible version. Rebuild the index.")
    )]
    Decode {
        artifact: &'static str,
        message: String,
    },

    #[error("artifacts are inconsistent: {message}")]
    #[diagnostic(
        code(trirag::load::inconsistent),
        help(
            "The vector array, triple array and ANN index disagree. \
             This usually means a build was interrupted; rebuild the index."
        )
    )]
    Inconsistent { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("query embedding failed")]
    #[diagnostic(code(trirag::query::embedding))]
    Embedding(#[source] ProviderError),

    #[error("query embedding has dimension {actual}, index has {expected}")]
    #[diagnostic(
        code(trirag::query::dim_mismatch),
        help("The serving embedding model differs from the one used to build the index.")
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query embedding is zero or has non-finite components")]
    #[diagnostic(
        code(trirag::query::degenerate_embedding),
        help("Cosine distance is undefined for this vector. Check the embedding model's output.")
    )]
    DegenerateEmbedding,

    #[error("k must be at least 1")]
    #[diagnostic(code(trirag::query::invalid_k))]
    InvalidK,

    #[error("query deadline exceeded after {stage}")]
    #[diagnostic(
        code(trirag::query::deadline),
        help("Raise `deadline_ms` in the [retrieval] config.")
    )]
    DeadlineExceeded { stage: &'static str },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(trirag::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(trirag::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(trirag::config::invalid), help("{message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning trirag results.
pub type TriragResult<T> = std::result::Result<T, TriragError>;
