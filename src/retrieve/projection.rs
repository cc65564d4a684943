//! Entity projection: every property of one subject flattened into a map.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::graph::{GraphStore, Literal, Term, local_name};

/// A projected property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl PropertyValue {
    /// Numeric if the text parses as a number, otherwise text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return PropertyValue::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(d) if d.is_finite() => PropertyValue::Decimal(d),
            _ => PropertyValue::Text(raw.to_string()),
        }
    }

    fn from_term(term: &Term) -> Self {
        match term {
            Term::Literal(Literal::Integer(i)) => PropertyValue::Integer(*i),
            Term::Literal(Literal::Decimal(d)) => PropertyValue::Decimal(*d),
            Term::Literal(Literal::String(s)) => PropertyValue::parse(s),
            Term::Iri(iri) => PropertyValue::Text(iri.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Decimal(d) => f.write_str(&Literal::Decimal(*d).lexical()),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

/// One entity with its properties keyed by lower-cased local name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityProjection {
    pub uri: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl EntityProjection {
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// Project `uri` from `graph`. When a property repeats, the last triple wins.
pub fn project(graph: &GraphStore, uri: &str) -> EntityProjection {
    let mut properties = BTreeMap::new();
    for triple in graph.triples_from(uri) {
        properties.insert(
            local_name(&triple.predicate).to_lowercase(),
            PropertyValue::from_term(&triple.object),
        );
    }
    EntityProjection {
        uri: uri.to_string(),
        properties,
    }
}
