//! Build pipeline: source rows → triples → embeddings → index → artifacts.
//!
//! Stages run in a fixed order:
//!
//! 1. **Materialize** every row of every table into one [`GraphStore`]
//! 2. **Embed** the serialized triples in chunks with bounded retry
//! 3. **Index** the successful embeddings, dropping failures in lockstep
//! 4. **Persist** `ann-index`, `vector-array`, `triple-array`, `graph-document`
//!
//! [`run_build`] never returns an error: failures are folded into
//! [`BuildResult::Error`].

use serde::{Deserialize, Serialize};

use crate::batch::{BatchEmbedder, BatchReport};
use crate::config::TriragConfig;
use crate::error::TriragResult;
use crate::graph::{GraphStore, Triple};
use crate::index::IndexBuilder;
use crate::materialize::Materializer;
use crate::provider::EmbeddingProvider;
use crate::source::RowSource;
use crate::store::BlobStore;

/// Named build stage, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Materialize,
    Embed,
    Index,
    Persist,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Materialize => "materialize",
            StageKind::Embed => "embed",
            StageKind::Index => "index",
            StageKind::Persist => "persist",
        }
    }
}

/// Outcome of a build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BuildResult {
    Success {
        triple_count: usize,
        embedded_count: usize,
    },
    Error {
        message: String,
    },
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildResult::Success { .. })
    }
}

/// Counters from a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub triple_count: usize,
    pub embedded_count: usize,
    pub batch: BatchReport,
}

/// Materialize every table of `source` into a fresh graph.
pub fn materialize_all(
    source: &dyn RowSource,
    materializer: &Materializer,
) -> TriragResult<GraphStore> {
    let mut graph = GraphStore::new();
    for table in source.tables()? {
        let rows = source.rows(&table)?;
        let mut emitted = 0;
        for row in &rows {
            emitted += materializer.materialize(&table, row, &mut graph);
        }
        tracing::info!(table = %table, rows = rows.len(), triples = emitted, "table materialized");
    }
    Ok(graph)
}

/// Run every stage, propagating the first error.
pub fn build(
    source: &dyn RowSource,
    provider: &dyn EmbeddingProvider,
    store: &dyn BlobStore,
    config: &TriragConfig,
) -> TriragResult<BuildSummary> {
    tracing::info!(stage = StageKind::Materialize.as_str(), "stage started");
    let materializer = Materializer::new(config.materialize.clone());
    let graph = materialize_all(source, &materializer)?;
    let triples: Vec<Triple> = graph.iter().collect();
    let texts: Vec<String> = triples.iter().map(Triple::to_string).collect();

    tracing::info!(
        stage = StageKind::Embed.as_str(),
        triples = texts.len(),
        chunk_size = config.batch.chunk_size,
        "stage started"
    );
    let output = BatchEmbedder::new(provider, config.batch.clone()).embed_all(&texts)?;
    let batch = output.report.clone();

    tracing::info!(stage = StageKind::Index.as_str(), "stage started");
    let built = IndexBuilder::new(config.index).build(&triples, output.outcomes)?;

    tracing::info!(stage = StageKind::Persist.as_str(), "stage started");
    built.persist(&graph, store)?;

    Ok(BuildSummary {
        triple_count: triples.len(),
        embedded_count: built.len(),
        batch,
    })
}

/// Build entry point. Errors are reported in the result, never raised.
pub fn run_build(
    source: &dyn RowSource,
    provider: &dyn EmbeddingProvider,
    store: &dyn BlobStore,
    config: &TriragConfig,
) -> BuildResult {
    match build(source, provider, store, config) {
        Ok(summary) => {
            tracing::info!(
                triple_count = summary.triple_count,
                embedded_count = summary.embedded_count,
                failed = summary.batch.failed,
                "build finished"
            );
            BuildResult::Success {
                triple_count: summary.triple_count,
                embedded_count: summary.embedded_count,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "build failed");
            BuildResult::Error {
                message: e.to_string(),
            }
        }
    }
}
