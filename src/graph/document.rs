//! Graph document: Turtle serialization of a [`GraphStore`] backed by oxigraph.
//!
//! The build persists the full graph as Turtle; the serving process parses it
//! back to rebuild its in-memory store.

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{
    Literal as RdfLiteral, NamedNode, NamedOrBlankNode, Term as RdfTerm, Triple as RdfTriple,
};

use crate::error::GraphError;

use super::{GraphStore, Literal, Term, Triple};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

fn named_node(iri: &str) -> GraphResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| GraphError::InvalidIri {
        iri: iri.to_string(),
        message: e.to_string(),
    })
}

fn to_rdf(triple: &Triple) -> GraphResult<RdfTriple> {
    let subject = named_node(&triple.subject)?;
    let predicate = named_node(&triple.predicate)?;
    let object: RdfTerm = match &triple.object {
        Term::Iri(iri) => named_node(iri)?.into(),
        Term::Literal(Literal::Integer(i)) => {
            RdfLiteral::new_typed_literal(i.to_string(), xsd::INTEGER).into()
        }
        Term::Literal(lit @ Literal::Decimal(_)) => {
            RdfLiteral::new_typed_literal(lit.lexical(), xsd::DECIMAL).into()
        }
        Term::Literal(Literal::String(s)) => RdfLiteral::new_simple_literal(s).into(),
    };
    Ok(RdfTriple::new(subject, predicate, object))
}

fn from_rdf_literal(lit: &RdfLiteral) -> Literal {
    let datatype = lit.datatype();
    if datatype == xsd::INTEGER {
        if let Ok(i) = lit.value().parse() {
            return Literal::Integer(i);
        }
    } else if datatype == xsd::DECIMAL || datatype == xsd::DOUBLE {
        if let Ok(d) = lit.value().parse() {
            return Literal::Decimal(d);
        }
    }
    Literal::String(lit.value().to_string())
}

/// Serialize every triple of the store as a Turtle document.
pub fn to_turtle(graph: &GraphStore) -> GraphResult<Vec<u8>> {
    let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle).for_writer(Vec::new());
    for triple in graph.iter() {
        let rdf = to_rdf(&triple)?;
        serializer
            .serialize_triple(&rdf)
            .map_err(|e| GraphError::Serialize {
                message: e.to_string(),
            })?;
    }
    serializer.finish().map_err(|e| GraphError::Serialize {
        message: e.to_string(),
    })
}

/// Parse a Turtle document into a fresh [`GraphStore`].
///
/// Statements with blank-node subjects or objects are skipped; the build
/// never produces them.
pub fn from_turtle(bytes: &[u8]) -> GraphResult<GraphStore> {
    let mut graph = GraphStore::new();
    let mut skipped = 0usize;

    for quad in RdfParser::from_format(RdfFormat::Turtle).for_reader(bytes) {
        let quad = quad.map_err(|e| GraphError::Parse {
            message: e.to_string(),
        })?;

        let subject = match &quad.subject {
            NamedOrBlankNode::NamedNode(node) => node.as_str().to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let object = match &quad.object {
            RdfTerm::NamedNode(node) => Term::Iri(node.as_str().to_string()),
            RdfTerm::Literal(lit) => Term::Literal(from_rdf_literal(lit)),
            _ => {
                skipped += 1;
                continue;
            }
        };

        graph.add(Triple {
            subject,
            predicate: quad.predicate.as_str().to_string(),
            object,
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "graph document contained unsupported statements");
    }
    Ok(graph)
}
