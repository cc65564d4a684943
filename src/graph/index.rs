//! In-memory graph store backed by `petgraph`.
//!
//! Nodes are terms (IRIs and literals), edges carry the predicate IRI.
//! Edge indices grow monotonically, so sorting by edge index recovers the
//! insertion order of triples.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::{Term, Triple};

/// In-memory triple collection with pattern lookup by subject or object.
///
/// Duplicate triples are kept; nothing is deduplicated.
#[derive(Default)]
pub struct GraphStore {
    /// The directed graph: subject node → object node, predicate on the edge.
    graph: DiGraph<Term, String>,
    /// Term → NodeIndex mapping for O(1) node lookups.
    node_index: HashMap<Term, NodeIndex>,
}

impl GraphStore {
    /// Create a new empty graph store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, term: Term) -> NodeIndex {
        if let Some(idx) = self.node_index.get(&term) {
            return *idx;
        }
        let idx = self.graph.add_node(term.clone());
        self.node_index.insert(term, idx);
        idx
    }

    /// Append a triple.
    pub fn add(&mut self, triple: Triple) {
        let subj_idx = self.ensure_node(Term::Iri(triple.subject));
        let obj_idx = self.ensure_node(triple.object);
        self.graph.add_edge(subj_idx, obj_idx, triple.predicate);
    }

    /// All triples matching a pattern, in insertion order.
    ///
    /// `None` in any position is a wildcard.
    pub fn matching(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&Term>,
    ) -> Vec<Triple> {
        let mut edges: Vec<EdgeIndex> = match (subject, object) {
            (Some(s), _) => {
                let Some(&idx) = self.node_index.get(&Term::Iri(s.to_string())) else {
                    return vec![];
                };
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|e| e.id())
                    .collect()
            }
            (None, Some(o)) => {
                let Some(&idx) = self.node_index.get(o) else {
                    return vec![];
                };
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| e.id())
                    .collect()
            }
            (None, None) => self.graph.edge_indices().collect(),
        };
        edges.sort_unstable();

        edges
            .into_iter()
            .filter_map(|ei| self.triple_at(ei))
            .filter(|t| predicate.is_none_or(|p| t.predicate == p))
            .filter(|t| object.is_none_or(|o| &t.object == o))
            .collect()
    }

    /// All triples with the given subject.
    pub fn triples_from(&self, subject: &str) -> Vec<Triple> {
        self.matching(Some(subject), None, None)
    }

    /// All triples whose object is the given IRI.
    pub fn triples_to(&self, object: &str) -> Vec<Triple> {
        self.matching(None, None, Some(&Term::Iri(object.to_string())))
    }

    /// Whether any triple has this IRI as its subject.
    pub fn contains_subject(&self, subject: &str) -> bool {
        self.node_index
            .get(&Term::Iri(subject.to_string()))
            .is_some_and(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .next()
                    .is_some()
            })
    }

    /// All triples in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Triple> + '_ {
        self.graph.edge_indices().filter_map(|ei| self.triple_at(ei))
    }

    /// Number of triples (edges).
    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the store holds no triples.
    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Number of distinct terms.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn triple_at(&self, ei: EdgeIndex) -> Option<Triple> {
        let (src, dst) = self.graph.edge_endpoints(ei)?;
        let subject = self.graph.node_weight(src)?.as_iri()?.to_string();
        let object = self.graph.node_weight(dst)?.clone();
        let predicate = self.graph.edge_weight(ei)?.clone();
        Some(Triple {
            subject,
            predicate,
            object,
        })
    }
}

impl FromIterator<Triple> for GraphStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut store = GraphStore::new();
        for triple in iter {
            store.add(triple);
        }
        store
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.node_count())
            .field("triples", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Literal;

    const A: &str = "http://ex.org/t/a";
    const B: &str = "http://ex.org/t/b";
    const C: &str = "http://ex.org/t/c";
    const NAME: &str = "http://ex.org/o/name";
    const PART_OF: &str = "http://ex.org/o/partOf";

    fn sample() -> GraphStore {
        [
            Triple::literal(A, NAME, Literal::String("alpha".into())),
            Triple::link(A, PART_OF, B),
            Triple::link(C, PART_OF, B),
            Triple::literal(B, NAME, Literal::String("beta".into())),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn match_by_subject_preserves_insertion_order() {
        let g = sample();
        let triples = g.triples_from(A);
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].predicate, NAME);
        assert_eq!(triples[1].predicate, PART_OF);
    }

    #[test]
    fn match_by_object() {
        let g = sample();
        let incoming = g.triples_to(B);
        let subjects: Vec<_> = incoming.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, vec![A, C]);
    }

    #[test]
    fn match_with_predicate_filter() {
        let g = sample();
        assert_eq!(g.matching(None, Some(NAME), None).len(), 2);
        assert_eq!(g.matching(Some(A), Some(PART_OF), None).len(), 1);
        assert!(g.matching(Some(B), Some(PART_OF), None).is_empty());
    }

    #[test]
    fn full_wildcard_returns_everything_in_order() {
        let g = sample();
        let all: Vec<_> = g.iter().collect();
        assert_eq!(all, g.matching(None, None, None));
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].subject, B);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut g = GraphStore::new();
        let t = Triple::literal(A, NAME, Literal::Integer(1));
        g.add(t.clone());
        g.add(t);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn literal_objects_never_become_subjects() {
        let g = sample();
        assert!(g.contains_subject(A));
        assert!(!g.contains_subject("http://ex.org/t/missing"));
        assert!(g.triples_from("alpha").is_empty());
    }

    #[test]
    fn empty_queries() {
        let g = GraphStore::new();
        assert!(g.is_empty());
        assert!(g.triples_from(A).is_empty());
        assert!(g.triples_to(A).is_empty());
    }
}
