//! Index construction.
//!
//! [`IndexBuilder::build`] takes triples and their embedding outcomes,
//! positionally aligned, and drops failed entries from both sequences in
//! lockstep. Ordinal `i` of the result names the same triple in the ANN
//! index, the vector array and the triple array.

pub mod ann;
pub mod artifacts;

pub use ann::{AnnIndex, AnnParams, Hit, HnswDump, has_direction};
pub use artifacts::{AnnArtifact, AnnHeader, LoadedArtifacts, VectorArray};

use crate::batch::Outcome;
use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::graph::{GraphStore, Triple, document};
use crate::store::BlobStore;

/// A compacted, gap-free index ready to persist.
#[derive(Debug)]
pub struct BuiltIndex {
    pub ann: AnnIndex,
    pub vectors: VectorArray,
    pub triples: Vec<String>,
    /// Entries dropped because their embedding failed.
    pub dropped: usize,
}

impl BuiltIndex {
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Write the four artifacts. The first failing `put` aborts.
    ///
    /// `graph` is the full materialized graph, including triples whose
    /// embedding failed.
    pub fn persist(&self, graph: &GraphStore, store: &dyn BlobStore) -> Result<(), IndexError> {
        let ann = AnnArtifact::new(&self.ann, self.vectors.dim)?;
        artifacts::put(store, artifacts::ANN_INDEX_KEY, &artifacts::encode_ann(&ann)?)?;
        artifacts::put(
            store,
            artifacts::VECTOR_ARRAY_KEY,
            &artifacts::encode_vectors(&self.vectors)?,
        )?;
        artifacts::put(
            store,
            artifacts::TRIPLE_ARRAY_KEY,
            &artifacts::encode_triples(&self.triples)?,
        )?;
        artifacts::put(store, artifacts::GRAPH_DOCUMENT_KEY, &document::to_turtle(graph)?)?;
        Ok(())
    }
}

/// Builds a [`BuiltIndex`] from aligned triples and outcomes.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    config: IndexConfig,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, triples: &[Triple], outcomes: Vec<Outcome>) -> Result<BuiltIndex, IndexError> {
        if triples.len() != outcomes.len() {
            return Err(IndexError::Misaligned {
                triples: triples.len(),
                outcomes: outcomes.len(),
            });
        }

        let mut kept_triples = Vec::with_capacity(triples.len());
        let mut kept_vectors: Vec<Vec<f32>> = Vec::with_capacity(triples.len());
        let mut dropped = 0;
        for (position, (triple, outcome)) in triples.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(vector) => {
                    let expected = kept_vectors.first().map_or(vector.len(), Vec::len);
                    if expected != vector.len() {
                        return Err(IndexError::DimensionMismatch {
                            position,
                            expected,
                            actual: vector.len(),
                        });
                    }
                    kept_triples.push(triple.to_string());
                    kept_vectors.push(vector);
                }
                Err(failed) => {
                    tracing::debug!(position, chunk = failed.chunk, "dropping unembedded triple");
                    dropped += 1;
                }
            }
        }

        let params = AnnParams::for_elements(&self.config, kept_vectors.len());
        let ann = AnnIndex::build(&kept_vectors, params);
        let vectors = VectorArray::from_rows(&kept_vectors);

        tracing::info!(
            entries = kept_triples.len(),
            dropped,
            dim = vectors.dim,
            max_layer = params.max_layer,
            "ann index built"
        );
        Ok(BuiltIndex {
            ann,
            vectors,
            triples: kept_triples,
            dropped,
        })
    }
}
