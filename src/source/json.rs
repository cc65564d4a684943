//! JSON source: one document mapping table names to arrays of row objects.
//!
//! ```json
//! { "helplines": [ { "id": 1, "name": "Women Helpline", "number": 1091 } ] }
//! ```
//!
//! Table and field order follow the document.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::SourceError;

use super::{Row, RowSource, Scalar, SourceResult};

/// Tables parsed from a JSON document.
#[derive(Debug, Clone)]
pub struct JsonSource {
    origin: String,
    tables: Map<String, Value>,
}

impl JsonSource {
    /// Read and parse a JSON source file.
    pub fn open(path: &Path) -> SourceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&path.display().to_string(), &content)
    }

    /// Parse a JSON source from text. `origin` names it in error messages.
    pub fn parse(origin: &str, content: &str) -> SourceResult<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| SourceError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        let Value::Object(tables) = value else {
            return Err(SourceError::Parse {
                path: origin.to_string(),
                message: "top level must be an object of tables".into(),
            });
        };
        Ok(Self {
            origin: origin.to_string(),
            tables,
        })
    }
}

fn scalar_from_json(value: &Value) -> Scalar {
    match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::String(b.to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Integer(i),
            None => n.as_f64().map_or(Scalar::String(n.to_string()), Scalar::Decimal),
        },
        Value::String(s) => Scalar::String(s.clone()),
        nested => Scalar::String(nested.to_string()),
    }
}

impl RowSource for JsonSource {
    fn tables(&self) -> SourceResult<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        let value = self
            .tables
            .get(table)
            .ok_or_else(|| SourceError::TableNotFound {
                table: table.to_string(),
            })?;
        let Value::Array(items) = value else {
            return Err(SourceError::Parse {
                path: self.origin.clone(),
                message: format!("table \"{table}\" is not an array"),
            });
        };

        let mut rows = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Object(fields) => rows.push(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), scalar_from_json(v)))
                        .collect(),
                ),
                _ => tracing::warn!(table, row = i, "skipping non-object row"),
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "police_stations": [
            {"id": 3, "name": "Central", "lat": 28.61, "open": true, "note": null}
        ],
        "helplines": [
            {"number": 1091, "name": "Women Helpline"},
            "garbage"
        ]
    }"#;

    #[test]
    fn tables_follow_document_order() {
        let source = JsonSource::parse("inline", DOC).unwrap();
        assert_eq!(source.tables().unwrap(), vec!["police_stations", "helplines"]);
    }

    #[test]
    fn values_are_typed() {
        let source = JsonSource::parse("inline", DOC).unwrap();
        let rows = source.rows("police_stations").unwrap();
        let row = &rows[0];
        let fields: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["id", "name", "lat", "open", "note"]);
        assert_eq!(row.get("id"), Some(&Scalar::Integer(3)));
        assert_eq!(row.get("lat"), Some(&Scalar::Decimal(28.61)));
        assert_eq!(row.get("open"), Some(&Scalar::String("true".into())));
        assert_eq!(row.get("note"), Some(&Scalar::Null));
    }

    #[test]
    fn non_object_rows_are_skipped() {
        let source = JsonSource::parse("inline", DOC).unwrap();
        assert_eq!(source.rows("helplines").unwrap().len(), 1);
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(matches!(
            JsonSource::parse("inline", "[1, 2]"),
            Err(SourceError::Parse { .. })
        ));
    }
}
