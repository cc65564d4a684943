//! Triple materialization: relational rows → RDF-style triples.
//!
//! Each non-null field of a row becomes one triple about the row's subject:
//!
//! ```text
//! <entity_ns>/<table>/<row-id>  <ontology_ns>/<field>  value
//! ```
//!
//! Integers and decimals keep their XSD type, everything else is a plain
//! string literal. Reference fields (and strings already inside the entity
//! namespace) become IRI objects so they can be followed during expansion.
//! A string that looks like an entity IRI but does not parse as one stays a
//! literal, so one bad cell never fails the graph document.
//!
//! Row ids are not checked for uniqueness: two rows of one table sharing an
//! id merge into a single subject.

use oxigraph::model::NamedNode;

use crate::config::MaterializeConfig;
use crate::graph::{GraphStore, Literal, Term, Triple};
use crate::source::{Row, Scalar};

/// Converts rows into triples under a fixed IRI scheme.
#[derive(Debug, Clone)]
pub struct Materializer {
    config: MaterializeConfig,
}

impl Materializer {
    pub fn new(config: MaterializeConfig) -> Self {
        Self { config }
    }

    /// Subject IRI for a row of `table` with the given id.
    pub fn subject_iri(&self, table: &str, row_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.entity_namespace.trim_end_matches('/'),
            urlencoding::encode(table),
            urlencoding::encode(row_id)
        )
    }

    /// Predicate IRI for a field name.
    pub fn predicate_iri(&self, field: &str) -> String {
        format!(
            "{}/{}",
            self.config.ontology_namespace.trim_end_matches('/'),
            urlencoding::encode(field)
        )
    }

    /// Append one triple per non-null field of `row` to `graph`.
    ///
    /// Returns the number of triples emitted.
    pub fn materialize(&self, table: &str, row: &Row, graph: &mut GraphStore) -> usize {
        let row_id = match row.get(&self.config.id_field) {
            Some(Scalar::Integer(i)) => i.to_string(),
            Some(Scalar::Decimal(d)) => Literal::Decimal(*d).lexical(),
            Some(Scalar::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        let subject = self.subject_iri(table, &row_id);

        let mut emitted = 0;
        for (field, value) in row.iter() {
            let Some(object) = self.object_for(field, value) else {
                continue;
            };
            graph.add(Triple {
                subject: subject.clone(),
                predicate: self.predicate_iri(field),
                object,
            });
            emitted += 1;
        }
        emitted
    }

    fn object_for(&self, field: &str, value: &Scalar) -> Option<Term> {
        if let Some(target) = self.config.references.get(field) {
            let id = match value {
                Scalar::Null => return None,
                Scalar::Integer(i) => i.to_string(),
                Scalar::Decimal(d) => Literal::Decimal(*d).lexical(),
                Scalar::String(s) => s.trim().to_string(),
            };
            return Some(Term::Iri(self.subject_iri(target, &id)));
        }

        match value {
            Scalar::Null => None,
            Scalar::Integer(i) => Some(Term::Literal(Literal::Integer(*i))),
            Scalar::Decimal(d) => Some(Term::Literal(Literal::Decimal(*d))),
            Scalar::String(s) if self.is_entity_iri(s) => Some(Term::Iri(s.clone())),
            Scalar::String(s) => Some(Term::Literal(Literal::String(s.clone()))),
        }
    }

    fn is_entity_iri(&self, value: &str) -> bool {
        let ns = self.config.entity_namespace.trim_end_matches('/');
        let in_namespace = value
            .strip_prefix(ns)
            .is_some_and(|rest| rest.starts_with('/'));
        if !in_namespace {
            return false;
        }
        match NamedNode::new(value) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(value, error = %e, "cell is not a valid IRI, kept as literal");
                false
            }
        }
    }
}
