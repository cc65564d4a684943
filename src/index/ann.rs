//! HNSW approximate nearest-neighbour index in cosine space.
//!
//! The graph is persisted through `hnsw_rs`'s own dump format. A dump is two
//! files (`<basename>.hnsw.graph` and `<basename>.hnsw.data`); [`HnswDump`]
//! carries both in memory so they can travel through any blob store.

use std::path::Path;

use anndists::dist::DistCosine;
use hnsw_rs::api::AnnT;
use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::hnswio::HnswIo;
use serde::{Deserialize, Serialize};

use crate::config::IndexConfig;
use crate::error::{IndexError, LoadError};

use super::artifacts::ANN_INDEX_KEY;

const DUMP_BASENAME: &str = "trirag";

/// Construction parameters of an [`AnnIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnParams {
    pub max_nb_connection: usize,
    pub ef_construction: usize,
    pub max_layer: usize,
}

impl AnnParams {
    /// Parameters for `n` elements; the layer count grows with `log2(n)`.
    pub fn for_elements(config: &IndexConfig, n: usize) -> Self {
        let max_layer = (n.max(2) as f64).log2().ceil() as usize;
        Self {
            max_nb_connection: config.max_nb_connection,
            ef_construction: config.ef_construction,
            max_layer: max_layer.clamp(4, 16),
        }
    }
}

/// Whether cosine distance is defined for `vector`: every component finite
/// and at least one non-zero.
pub fn has_direction(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite()) && vector.iter().any(|x| *x != 0.0)
}

/// The two files of one `hnsw_rs` dump. Both are empty for an empty index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswDump {
    /// Description, layers and neighbour lists.
    pub graph: Vec<u8>,
    /// Point vectors with their ordinals.
    pub data: Vec<u8>,
}

impl HnswDump {
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty() && self.data.is_empty()
    }
}

fn dump_file(dir: &Path, basename: &str, kind: &str) -> std::path::PathBuf {
    dir.join(format!("{basename}.hnsw.{kind}"))
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub ordinal: usize,
    /// Cosine distance, `1 - cos(q, v)`.
    pub distance: f32,
}

/// HNSW index over dense ordinals `0..len`.
pub struct AnnIndex {
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    params: AnnParams,
    len: usize,
}

// Safety: Hnsw guards its layers with internal locks; after construction the
// index is only searched through `&self`.
unsafe impl Send for AnnIndex {}
unsafe impl Sync for AnnIndex {}

impl std::fmt::Debug for AnnIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnIndex")
            .field("len", &self.len)
            .field("params", &self.params)
            .finish()
    }
}

impl AnnIndex {
    /// Build an index whose point `i` is `vectors[i]`.
    pub fn build<V: AsRef<[f32]>>(vectors: &[V], params: AnnParams) -> Self {
        if vectors.is_empty() {
            return Self {
                hnsw: None,
                params,
                len: 0,
            };
        }
        let hnsw = Hnsw::new(
            params.max_nb_connection,
            vectors.len(),
            params.max_layer,
            params.ef_construction,
            DistCosine {},
        );
        for (ordinal, vector) in vectors.iter().enumerate() {
            hnsw.insert((vector.as_ref(), ordinal));
        }
        Self {
            hnsw: Some(hnsw),
            params,
            len: vectors.len(),
        }
    }

    /// Serialize the graph exactly as built.
    pub fn dump(&self) -> Result<HnswDump, IndexError> {
        let Some(hnsw) = &self.hnsw else {
            return Ok(HnswDump::default());
        };
        let encode = |message: String| IndexError::Encode {
            artifact: ANN_INDEX_KEY,
            message,
        };
        let dir = tempfile::TempDir::new().map_err(|e| encode(e.to_string()))?;
        let basename = hnsw
            .file_dump(dir.path(), DUMP_BASENAME)
            .map_err(|e| encode(e.to_string()))?;
        let read = |kind: &str| {
            std::fs::read(dump_file(dir.path(), &basename, kind)).map_err(|e| encode(e.to_string()))
        };
        Ok(HnswDump {
            graph: read("graph")?,
            data: read("data")?,
        })
    }

    /// Reload a graph written by [`AnnIndex::dump`]. Points keep the
    /// ordinals they were inserted with.
    pub fn restore(dump: &HnswDump, params: AnnParams) -> Result<Self, LoadError> {
        if dump.is_empty() {
            return Ok(Self {
                hnsw: None,
                params,
                len: 0,
            });
        }
        let decode = |message: String| LoadError::Decode {
            artifact: ANN_INDEX_KEY,
            message,
        };
        let dir = tempfile::TempDir::new().map_err(|e| decode(e.to_string()))?;
        for (kind, bytes) in [("graph", &dump.graph), ("data", &dump.data)] {
            std::fs::write(dump_file(dir.path(), DUMP_BASENAME, kind), bytes)
                .map_err(|e| decode(e.to_string()))?;
        }

        let path = dir.path().to_path_buf();
        // hnsw_rs asserts on malformed dumps rather than returning an error.
        let loaded: std::thread::Result<Result<Hnsw<'static, f32, DistCosine>, String>> =
            std::panic::catch_unwind(move || {
                // The reloaded graph borrows its loader for its whole life.
                // Without mmap the loader holds no point data, so it is leaked.
                let loader: &'static mut HnswIo =
                    Box::leak(Box::new(HnswIo::new(&path, DUMP_BASENAME)));
                loader
                    .load_hnsw::<f32, DistCosine>()
                    .map_err(|e| e.to_string())
            });
        let hnsw = match loaded {
            Ok(result) => result.map_err(decode)?,
            Err(_) => return Err(decode("malformed hnsw dump".into())),
        };

        let len = hnsw.get_nb_point();
        Ok(Self {
            hnsw: Some(hnsw),
            params,
            len,
        })
    }

    /// Visit every stored point as `(ordinal, vector)`, stopping at the
    /// first error.
    pub fn try_for_each_point<E>(
        &self,
        mut f: impl FnMut(usize, &[f32]) -> Result<(), E>,
    ) -> Result<(), E> {
        let Some(hnsw) = &self.hnsw else {
            return Ok(());
        };
        for point in hnsw.get_point_indexation() {
            f(point.get_origin_id(), point.get_v())?;
        }
        Ok(())
    }

    /// The `k` nearest points to `query`, by ascending distance and then
    /// ascending ordinal. Returns fewer than `k` hits only when the index is
    /// smaller than `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Hit> {
        let Some(hnsw) = &self.hnsw else {
            return Vec::new();
        };
        let k = k.min(self.len);
        if k == 0 {
            return Vec::new();
        }
        // Over-fetch so equal distances at the cut are decided by ordinal.
        let fetch = (k * 2).min(self.len);
        let ef_search = (fetch * 2).max(32);

        let mut hits: Vec<Hit> = hnsw
            .search(query, fetch, ef_search)
            .into_iter()
            .map(|n| Hit {
                ordinal: n.d_id,
                distance: n.distance,
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        hits.dedup_by_key(|h| h.ordinal);
        hits.truncate(k);
        hits
    }

    /// Number of points the HNSW graph actually holds.
    pub fn element_count(&self) -> usize {
        self.hnsw.as_ref().map_or(0, |h| h.get_nb_point())
    }

    pub fn params(&self) -> AnnParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn params(n: usize) -> AnnParams {
        AnnParams::for_elements(&IndexConfig::default(), n)
    }

    #[test]
    fn layer_count_is_clamped() {
        assert_eq!(params(0).max_layer, 4);
        assert_eq!(params(1_000).max_layer, 10);
        assert_eq!(params(1 << 20).max_layer, 16);
    }

    #[test]
    fn nearest_of_two_axes() {
        let index = AnnIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]], params(2));
        let hits = index.search(&[0.9, 0.1], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ordinal, 0);
        assert_eq!(index.element_count(), 2);
    }

    #[test]
    fn hits_are_distinct_and_sorted() {
        let mut rng = StdRng::seed_from_u64(7);
        let vectors: Vec<Vec<f32>> = (0..200)
            .map(|_| (0..16).map(|_| rng.r#gen::<f32>() - 0.5).collect())
            .collect();
        let index = AnnIndex::build(&vectors, params(vectors.len()));
        let hits = index.search(&vectors[17], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].ordinal, 17);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        let mut ords: Vec<_> = hits.iter().map(|h| h.ordinal).collect();
        ords.dedup();
        assert_eq!(ords.len(), 3);
    }

    #[test]
    fn equal_distances_prefer_lower_ordinal() {
        let index = AnnIndex::build(
            &[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]],
            params(4),
        );
        let hits = index.search(&[1.0, 0.0], 2);
        let ords: Vec<_> = hits.iter().map(|h| h.ordinal).collect();
        assert_eq!(ords, vec![1, 2]);
    }

    #[test]
    fn k_larger_than_index_is_clamped() {
        let index = AnnIndex::build(&[vec![1.0, 0.0], vec![0.0, 1.0]], params(2));
        assert_eq!(index.search(&[1.0, 1.0], 10).len(), 2);
    }

    #[test]
    fn degenerate_vectors_have_no_direction() {
        assert!(has_direction(&[0.0, 0.3]));
        assert!(!has_direction(&[0.0, 0.0]));
        assert!(!has_direction(&[f32::NAN, 1.0]));
        assert!(!has_direction(&[f32::INFINITY, 1.0]));
        assert!(!has_direction(&[]));
    }

    #[test]
    fn dump_restores_the_same_graph() {
        let mut rng = StdRng::seed_from_u64(11);
        let vectors: Vec<Vec<f32>> = (0..120)
            .map(|_| (0..8).map(|_| rng.r#gen::<f32>() - 0.5).collect())
            .collect();
        let built = AnnIndex::build(&vectors, params(vectors.len()));
        let restored = AnnIndex::restore(&built.dump().unwrap(), built.params()).unwrap();

        assert_eq!(restored.len(), 120);
        assert_eq!(restored.element_count(), 120);
        for probe in [0, 33, 119] {
            assert_eq!(
                restored.search(&vectors[probe], 5),
                built.search(&vectors[probe], 5)
            );
        }

        let mut visited = vec![false; vectors.len()];
        restored
            .try_for_each_point(|ordinal, stored| {
                assert_eq!(stored, vectors[ordinal].as_slice());
                visited[ordinal] = true;
                Ok::<(), ()>(())
            })
            .unwrap();
        assert!(visited.iter().all(|v| *v));
    }

    #[test]
    fn garbage_dump_is_a_decode_error() {
        let dump = HnswDump {
            graph: vec![0xde, 0xad, 0xbe, 0xef],
            data: vec![1, 2, 3],
        };
        assert!(matches!(
            AnnIndex::restore(&dump, params(4)),
            Err(LoadError::Decode {
                artifact: "ann-index",
                ..
            })
        ));
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = AnnIndex::build::<Vec<f32>>(&[], params(0));
        assert!(index.is_empty());
        assert_eq!(index.element_count(), 0);
        assert!(index.search(&[1.0], 5).is_empty());

        let dump = index.dump().unwrap();
        assert!(dump.is_empty());
        assert!(AnnIndex::restore(&dump, params(0)).unwrap().is_empty());
    }
}
