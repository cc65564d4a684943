//! Persisted index artifacts and the loader's consistency checks.
//!
//! | key              | encoding | content                                   |
//! |------------------|----------|-------------------------------------------|
//! | `ann-index`      | bincode  | [`AnnArtifact`]: header plus HNSW dump    |
//! | `vector-array`   | bincode  | [`VectorArray`]: row-major `rows × dim`   |
//! | `triple-array`   | JSON     | ordinal-ordered serialized triples        |
//! | `graph-document` | Turtle   | every materialized triple                 |

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, LoadError, StoreError};
use crate::graph::{GraphStore, document};
use crate::store::BlobStore;

use super::ann::{AnnIndex, AnnParams, HnswDump};

pub const ANN_INDEX_KEY: &str = "ann-index";
pub const VECTOR_ARRAY_KEY: &str = "vector-array";
pub const TRIPLE_ARRAY_KEY: &str = "triple-array";
pub const GRAPH_DOCUMENT_KEY: &str = "graph-document";

/// Format tag written into every [`AnnHeader`].
pub const ANN_FORMAT: &str = "trirag-hnsw/1";
/// The only distance space this crate builds.
pub const ANN_SPACE: &str = "cosine";

/// Dense row-major matrix of embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorArray {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl VectorArray {
    /// Pack equal-length vectors. `dim` is taken from the first row.
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            data.extend_from_slice(row);
        }
        Self {
            rows: rows.len(),
            dim,
            data,
        }
    }

    /// Row `i`, if present.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.rows {
            return None;
        }
        self.data.get(i * self.dim..(i + 1) * self.dim)
    }
}

/// Self-describing header of the `ann-index` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnHeader {
    pub format: String,
    pub space: String,
    pub dim: usize,
    pub element_count: usize,
    /// Capacity the graph was constructed for; never below `element_count`.
    pub max_elements: usize,
    pub max_nb_connection: usize,
    pub ef_construction: usize,
    pub max_layer: usize,
}

impl AnnHeader {
    pub fn new(index: &AnnIndex, dim: usize) -> Self {
        let params = index.params();
        Self {
            format: ANN_FORMAT.into(),
            space: ANN_SPACE.into(),
            dim,
            element_count: index.len(),
            max_elements: index.len(),
            max_nb_connection: params.max_nb_connection,
            ef_construction: params.ef_construction,
            max_layer: params.max_layer,
        }
    }

    pub fn params(&self) -> AnnParams {
        AnnParams {
            max_nb_connection: self.max_nb_connection,
            ef_construction: self.ef_construction,
            max_layer: self.max_layer,
        }
    }
}

/// Content of the `ann-index` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnArtifact {
    pub header: AnnHeader,
    pub dump: HnswDump,
}

impl AnnArtifact {
    pub fn new(index: &AnnIndex, dim: usize) -> Result<Self, IndexError> {
        Ok(Self {
            header: AnnHeader::new(index, dim),
            dump: index.dump()?,
        })
    }
}

/// Everything the retrieval engine needs, validated.
pub struct LoadedArtifacts {
    pub ann: AnnIndex,
    pub vectors: VectorArray,
    pub triples: Vec<String>,
    pub graph: GraphStore,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub(crate) fn encode_ann(artifact: &AnnArtifact) -> Result<Vec<u8>, IndexError> {
    bincode::serialize(artifact).map_err(|e| IndexError::Encode {
        artifact: ANN_INDEX_KEY,
        message: e.to_string(),
    })
}

pub(crate) fn encode_vectors(vectors: &VectorArray) -> Result<Vec<u8>, IndexError> {
    bincode::serialize(vectors).map_err(|e| IndexError::Encode {
        artifact: VECTOR_ARRAY_KEY,
        message: e.to_string(),
    })
}

pub(crate) fn encode_triples(triples: &[String]) -> Result<Vec<u8>, IndexError> {
    serde_json::to_vec(triples).map_err(|e| IndexError::Encode {
        artifact: TRIPLE_ARRAY_KEY,
        message: e.to_string(),
    })
}

/// Write one artifact, wrapping the store error with the artifact name.
pub(crate) fn put(store: &dyn BlobStore, key: &'static str, bytes: &[u8]) -> Result<(), IndexError> {
    store
        .put(key, bytes)
        .map_err(|source| IndexError::Persistence {
            artifact: key,
            source,
        })?;
    tracing::info!(artifact = key, bytes = bytes.len(), "artifact persisted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn fetch(store: &dyn BlobStore, key: &'static str) -> Result<Vec<u8>, LoadError> {
    store.get(key).map_err(|source: StoreError| LoadError::Missing {
        artifact: key,
        source,
    })
}

fn inconsistent(message: String) -> LoadError {
    LoadError::Inconsistent { message }
}

/// Load all four artifacts and verify they describe the same index.
pub fn load(store: &dyn BlobStore) -> Result<LoadedArtifacts, LoadError> {
    let AnnArtifact { header, dump } =
        bincode::deserialize(&fetch(store, ANN_INDEX_KEY)?).map_err(|e| LoadError::Decode {
            artifact: ANN_INDEX_KEY,
            message: e.to_string(),
        })?;
    let vectors: VectorArray =
        bincode::deserialize(&fetch(store, VECTOR_ARRAY_KEY)?).map_err(|e| LoadError::Decode {
            artifact: VECTOR_ARRAY_KEY,
            message: e.to_string(),
        })?;
    let triples: Vec<String> = serde_json::from_slice(&fetch(store, TRIPLE_ARRAY_KEY)?)
        .map_err(|e| LoadError::Decode {
            artifact: TRIPLE_ARRAY_KEY,
            message: e.to_string(),
        })?;
    let graph = document::from_turtle(&fetch(store, GRAPH_DOCUMENT_KEY)?)?;

    check_header(&header)?;
    check_vectors(&vectors)?;
    if vectors.rows != triples.len() {
        return Err(inconsistent(format!(
            "vector-array has {} rows but triple-array has {} entries",
            vectors.rows,
            triples.len()
        )));
    }
    if header.element_count != vectors.rows || header.dim != vectors.dim {
        return Err(inconsistent(format!(
            "ann-index describes {} × {} but vector-array is {} × {}",
            header.element_count, header.dim, vectors.rows, vectors.dim
        )));
    }

    let ann = AnnIndex::restore(&dump, header.params())?;
    if ann.element_count() != vectors.rows {
        return Err(inconsistent(format!(
            "ann-index graph holds {} points, expected {}",
            ann.element_count(),
            vectors.rows
        )));
    }
    check_points(&ann, &vectors)?;

    tracing::info!(
        entries = vectors.rows,
        dim = vectors.dim,
        graph_triples = graph.len(),
        "index artifacts loaded"
    );
    Ok(LoadedArtifacts {
        ann,
        vectors,
        triples,
        graph,
    })
}

fn check_header(header: &AnnHeader) -> Result<(), LoadError> {
    if header.format != ANN_FORMAT {
        return Err(inconsistent(format!(
            "unknown ann-index format \"{}\"",
            header.format
        )));
    }
    if header.space != ANN_SPACE {
        return Err(inconsistent(format!(
            "unsupported distance space \"{}\"",
            header.space
        )));
    }
    if header.max_elements < header.element_count {
        return Err(inconsistent(format!(
            "ann-index declares capacity {} for {} elements",
            header.max_elements, header.element_count
        )));
    }
    Ok(())
}

fn check_vectors(vectors: &VectorArray) -> Result<(), LoadError> {
    let Some(expected) = vectors.rows.checked_mul(vectors.dim) else {
        return Err(inconsistent(format!(
            "vector-array shape {} × {} overflows",
            vectors.rows, vectors.dim
        )));
    };
    if vectors.data.len() != expected {
        return Err(inconsistent(format!(
            "vector-array holds {} values, expected {} rows × {} dims",
            vectors.data.len(),
            vectors.rows,
            vectors.dim
        )));
    }
    if vectors.rows > 0 && vectors.dim == 0 {
        return Err(inconsistent("vector-array has rows of dimension 0".into()));
    }
    Ok(())
}

/// Each graph point must carry the vector-array row of its ordinal, and each
/// ordinal must appear exactly once.
fn check_points(ann: &AnnIndex, vectors: &VectorArray) -> Result<(), LoadError> {
    let mut seen = vec![false; vectors.rows];
    ann.try_for_each_point(|ordinal, stored| {
        match (vectors.row(ordinal), seen.get_mut(ordinal)) {
            (Some(row), Some(slot)) if !*slot && row == stored => {
                *slot = true;
                Ok(())
            }
            _ => Err(inconsistent(format!(
                "ann-index point {ordinal} does not match vector-array"
            ))),
        }
    })
}
