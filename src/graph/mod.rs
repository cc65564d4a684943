//! Knowledge graph: RDF-style triples over IRIs and typed literals.
//!
//! - **In-memory layer** ([`GraphStore`]): `petgraph` directed graph with
//!   subject/object pattern lookup, insertion-ordered
//! - **Graph document** ([`document`]): Turtle serialization via `oxigraph`,
//!   used to persist the full graph and rebuild it at serve time

pub mod document;
pub mod index;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use index::GraphStore;

/// XML Schema datatype IRI for integer literals.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// XML Schema datatype IRI for decimal literals.
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

/// A typed literal value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    String(String),
}

impl Literal {
    /// Lexical form of the literal, as written in the triple array.
    pub fn lexical(&self) -> String {
        match self {
            Literal::Integer(i) => i.to_string(),
            Literal::Decimal(d) => format_decimal(*d),
            Literal::String(s) => s.clone(),
        }
    }

    /// Datatype IRI, or `None` for plain string literals.
    pub fn datatype(&self) -> Option<&'static str> {
        match self {
            Literal::Integer(_) => Some(XSD_INTEGER),
            Literal::Decimal(_) => Some(XSD_DECIMAL),
            Literal::String(_) => None,
        }
    }
}

// Decimals compare by bit pattern so literals can key graph nodes.
impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a == b,
            (Literal::Decimal(a), Literal::Decimal(b)) => a.to_bits() == b.to_bits(),
            (Literal::String(a), Literal::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Integer(i) => i.hash(state),
            Literal::Decimal(d) => d.to_bits().hash(state),
            Literal::String(s) => s.hash(state),
        }
    }
}

/// Object position of a triple: an IRI or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Literal(Literal),
}

impl Term {
    /// The IRI, if this term is one.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => f.write_str(iri),
            Term::Literal(lit) => f.write_str(&lit.lexical()),
        }
    }
}

/// A triple (subject, predicate, object) in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject IRI.
    pub subject: String,
    /// Predicate IRI.
    pub predicate: String,
    /// Object IRI or literal.
    pub object: Term,
}

impl Triple {
    /// Create a triple with a literal object.
    pub fn literal(subject: impl Into<String>, predicate: impl Into<String>, object: Literal) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Term::Literal(object),
        }
    }

    /// Create a triple linking two IRIs.
    pub fn link(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Term::Iri(object.into()),
        }
    }
}

/// Serialized form `"<subject> <predicate> <object>"`, used for embedding
/// and for the persisted triple array.
impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// Local name of an IRI: the segment after the last `/` or `#`.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['/', '#']).next().unwrap_or(iri)
}

/// Subject of a serialized triple string (its first whitespace-separated token).
pub fn subject_of(serialized: &str) -> Option<&str> {
    serialized.split_whitespace().next()
}

fn format_decimal(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 {
        format!("{d:.1}")
    } else {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_handles_slash_and_hash() {
        assert_eq!(local_name("http://example.org/ontology/partOf"), "partOf");
        assert_eq!(local_name("http://www.w3.org/2001/XMLSchema#integer"), "integer");
        assert_eq!(local_name("bare"), "bare");
    }

    #[test]
    fn triple_serializes_as_space_separated() {
        let t = Triple::literal("http://ex.org/t/1", "http://ex.org/o/age", Literal::Integer(42));
        assert_eq!(t.to_string(), "http://ex.org/t/1 http://ex.org/o/age 42");
        assert_eq!(subject_of(&t.to_string()), Some("http://ex.org/t/1"));
    }

    #[test]
    fn decimal_lexical_keeps_a_fraction() {
        assert_eq!(Literal::Decimal(3.0).lexical(), "3.0");
        assert_eq!(Literal::Decimal(2.5).lexical(), "2.5");
    }

    #[test]
    fn decimal_literals_hash_consistently() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Term::Literal(Literal::Decimal(1.5)));
        assert!(set.contains(&Term::Literal(Literal::Decimal(1.5))));
        assert!(!set.contains(&Term::Literal(Literal::Integer(1))));
    }
}
