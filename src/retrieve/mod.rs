//! Retrieval engine: query → k-NN seeds → one-hop expansion → projections.
//!
//! The engine is loaded once from the persisted artifacts and is immutable
//! afterwards; share it across threads behind an `Arc`.

pub mod projection;

pub use projection::{EntityProjection, PropertyValue, project};

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::error::{LoadError, QueryError};
use crate::graph::{GraphStore, Term, local_name, subject_of};
use crate::index::artifacts;
use crate::index::{AnnIndex, Hit, has_direction};
use crate::provider::EmbeddingProvider;
use crate::store::BlobStore;

/// Per-query knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub k: usize,
    /// Bound on embedding plus search time.
    pub deadline: Option<Duration>,
}

impl QueryOptions {
    pub fn new(k: usize) -> Self {
        Self { k, deadline: None }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Entities relevant to a query: seeds in rank order, then expansions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub entities: Vec<EntityProjection>,
    pub seed_count: usize,
    pub expanded_count: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity block handed to the generator.
    pub fn render_context(&self) -> String {
        let mut out = String::new();
        for entity in &self.entities {
            let _ = writeln!(out, "Entity: {}", entity.uri);
            for (key, value) in &entity.properties {
                let _ = writeln!(out, "  {key}: {value}");
            }
        }
        out
    }
}

/// Read-only retrieval over one loaded index.
pub struct RetrievalEngine {
    ann: AnnIndex,
    triples: Vec<String>,
    graph: GraphStore,
    dim: usize,
    provider: Arc<dyn EmbeddingProvider>,
    relations: HashSet<String>,
    defaults: QueryOptions,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("entries", &self.triples.len())
            .field("dim", &self.dim)
            .field("graph_triples", &self.graph.len())
            .field("relations", &self.relations)
            .finish()
    }
}

impl RetrievalEngine {
    /// Load and validate every artifact from `store`.
    pub fn initialize(
        store: &dyn BlobStore,
        provider: Arc<dyn EmbeddingProvider>,
        config: &RetrievalConfig,
    ) -> Result<Self, LoadError> {
        let loaded = artifacts::load(store)?;
        Ok(Self {
            ann: loaded.ann,
            triples: loaded.triples,
            graph: loaded.graph,
            dim: loaded.vectors.dim,
            provider,
            relations: config.relations.iter().map(|r| r.to_lowercase()).collect(),
            defaults: QueryOptions {
                k: config.k,
                deadline: config.deadline(),
            },
        })
    }

    /// Retrieve with the configured deadline and an explicit `k`.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult, QueryError> {
        self.retrieve_with(
            query,
            &QueryOptions {
                k,
                ..self.defaults
            },
        )
    }

    /// Options this engine was configured with.
    pub fn default_options(&self) -> QueryOptions {
        self.defaults
    }

    pub fn retrieve_with(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<RetrievalResult, QueryError> {
        if options.k == 0 {
            return Err(QueryError::InvalidK);
        }
        if self.is_empty() {
            tracing::debug!("empty index, skipping query embedding");
            return Ok(RetrievalResult::default());
        }

        let started = Instant::now();
        let check_deadline = |stage: &'static str| match options.deadline {
            Some(limit) if started.elapsed() > limit => {
                Err(QueryError::DeadlineExceeded { stage })
            }
            _ => Ok(()),
        };

        let vector = self.provider.embed_one(query).map_err(QueryError::Embedding)?;
        check_deadline("embedding")?;
        if vector.len() != self.dim {
            return Err(QueryError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        if !has_direction(&vector) {
            return Err(QueryError::DegenerateEmbedding);
        }

        let hits = self.nearest(&vector, options.k);
        check_deadline("search")?;

        let mut seen = HashSet::new();
        let seeds: Vec<String> = hits
            .iter()
            .filter_map(|hit| self.triple(hit.ordinal))
            .filter_map(subject_of)
            .filter(|s| seen.insert(s.to_string()))
            .map(str::to_string)
            .collect();

        let expanded = self.expand(&seeds, &mut seen);
        tracing::debug!(
            hits = hits.len(),
            seeds = seeds.len(),
            expanded = expanded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query retrieved"
        );

        let entities = seeds
            .iter()
            .chain(expanded.iter())
            .map(|uri| project(&self.graph, uri))
            .collect();
        Ok(RetrievalResult {
            entities,
            seed_count: seeds.len(),
            expanded_count: expanded.len(),
        })
    }

    /// One hop along allow-listed relations, in either direction.
    fn expand(&self, seeds: &[String], seen: &mut HashSet<String>) -> Vec<String> {
        let mut expanded = Vec::new();
        let mut admit = |uri: String, expanded: &mut Vec<String>| {
            if seen.insert(uri.clone()) {
                expanded.push(uri);
            }
        };

        for seed in seeds {
            for triple in self.graph.triples_from(seed) {
                if !self.follows(&triple.predicate) {
                    continue;
                }
                match triple.object {
                    Term::Iri(iri) => admit(iri, &mut expanded),
                    // A literal endpoint counts only if it names a known subject.
                    Term::Literal(lit) => {
                        let lexical = lit.lexical();
                        if self.graph.contains_subject(&lexical) {
                            admit(lexical, &mut expanded);
                        }
                    }
                }
            }
            for triple in self.graph.triples_to(seed) {
                if self.follows(&triple.predicate) {
                    admit(triple.subject, &mut expanded);
                }
            }
        }
        expanded
    }

    fn follows(&self, predicate: &str) -> bool {
        self.relations.contains(&local_name(predicate).to_lowercase())
    }

    /// Raw k-NN over the index; `k` is clamped to the index size.
    pub fn nearest(&self, vector: &[f32], k: usize) -> Vec<Hit> {
        self.ann.search(vector, k)
    }

    /// Serialized triple stored at `ordinal`.
    pub fn triple(&self, ordinal: usize) -> Option<&str> {
        self.triples.get(ordinal).map(String::as_str)
    }

    /// The serving graph.
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Number of index entries.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Embedding dimension; 0 for an empty index.
    pub fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::graph::{Literal, Triple};
    use crate::index::IndexBuilder;
    use crate::store::MemBlobStore;

    struct Axis;

    impl EmbeddingProvider for Axis {
        fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(batch
                .iter()
                .map(|s| if s.contains("alpha") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
                .collect())
        }
    }

    fn engine(triples: Vec<Triple>, config: &RetrievalConfig) -> RetrievalEngine {
        let graph: GraphStore = triples.iter().cloned().collect();
        let texts: Vec<String> = triples.iter().map(Triple::to_string).collect();
        let outcomes = Axis.embed(&texts).unwrap().into_iter().map(Ok).collect();
        let store = MemBlobStore::new();
        IndexBuilder::default()
            .build(&triples, outcomes)
            .unwrap()
            .persist(&graph, &store)
            .unwrap();
        RetrievalEngine::initialize(&store, Arc::new(Axis), config).unwrap()
    }

    const ONT: &str = "http://example.org/ontology";

    fn iri(name: &str) -> String {
        format!("http://example.org/bigquery/t/{name}")
    }

    #[test]
    fn seeds_are_deduplicated_in_rank_order() {
        let e = engine(
            vec![
                Triple::literal(iri("a"), format!("{ONT}/name"), Literal::String("alpha".into())),
                Triple::literal(iri("a"), format!("{ONT}/tag"), Literal::String("alpha2".into())),
                Triple::literal(iri("b"), format!("{ONT}/name"), Literal::String("beta".into())),
            ],
            &RetrievalConfig::default(),
        );
        let result = e.retrieve("alpha", 3).unwrap();
        assert_eq!(result.seed_count, 2);
        assert_eq!(result.entities[0].uri, iri("a"));
        assert_eq!(result.entities[1].uri, iri("b"));
    }

    #[test]
    fn expansion_follows_both_directions_case_insensitively() {
        let e = engine(
            vec![
                Triple::literal(iri("a"), format!("{ONT}/name"), Literal::String("alpha".into())),
                Triple::link(iri("a"), format!("{ONT}/PartOf"), iri("district")),
                Triple::link(iri("fan"), format!("{ONT}/influencedBy"), iri("a")),
                Triple::link(iri("a"), format!("{ONT}/sameCity"), iri("other")),
            ],
            &RetrievalConfig::default(),
        );
        let result = e.retrieve("alpha", 1).unwrap();
        let uris: Vec<_> = result.entities.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec![iri("a"), iri("district"), iri("fan")]);
        assert_eq!(result.expanded_count, 2);
    }

    #[test]
    fn literal_endpoint_expands_only_to_known_subjects() {
        let e = engine(
            vec![
                Triple::literal(iri("a"), format!("{ONT}/name"), Literal::String("alpha".into())),
                Triple::literal(iri("a"), format!("{ONT}/partof"), Literal::String(iri("b"))),
                Triple::literal(iri("a"), format!("{ONT}/influencedby"), Literal::String("nobody".into())),
                Triple::literal(iri("b"), format!("{ONT}/name"), Literal::String("beta".into())),
            ],
            &RetrievalConfig::default(),
        );
        let result = e.retrieve("alpha", 1).unwrap();
        let uris: Vec<_> = result.entities.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec![iri("a"), iri("b")]);
    }

    #[test]
    fn zero_k_is_rejected() {
        let e = engine(
            vec![Triple::literal(iri("a"), format!("{ONT}/name"), Literal::String("alpha".into()))],
            &RetrievalConfig::default(),
        );
        assert!(matches!(e.retrieve("alpha", 0), Err(QueryError::InvalidK)));
    }

    #[test]
    fn context_lists_sorted_properties() {
        let e = engine(
            vec![
                Triple::literal(iri("a"), format!("{ONT}/zone"), Literal::String("alpha".into())),
                Triple::literal(iri("a"), format!("{ONT}/Area"), Literal::Decimal(3.0)),
            ],
            &RetrievalConfig::default(),
        );
        let ctx = e.retrieve("alpha", 1).unwrap().render_context();
        assert_eq!(
            ctx,
            format!("Entity: {}\n  area: 3.0\n  zone: alpha\n", iri("a"))
        );
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RetrievalEngine>();
    }
}
