//! Relational data sources: named tables of ordered rows.
//!
//! A [`RowSource`] yields the rows of each table as an ordered mapping of
//! field name → [`Scalar`]. Three sources are provided:
//!
//! - [`MemorySource`]: tables assembled in process (tests, embedding callers)
//! - [`json::JsonSource`]: a JSON object of `table → [row objects]`
//! - [`csv_dir::CsvDirSource`]: a directory with one CSV file per table

pub mod csv_dir;
pub mod json;

use serde::Serialize;

use crate::config::{SourceConfig, SourceKind};
use crate::error::SourceError;

/// Result type for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Integer(i64),
    Decimal(f64),
    String(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Infer a scalar from raw text: integer, then decimal, then string.
    /// Empty text is null.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Scalar::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Scalar::Integer(i);
        }
        if let Ok(d) = trimmed.parse::<f64>() {
            if d.is_finite() {
                return Scalar::Decimal(d);
            }
        }
        Scalar::String(raw.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<f64> for Scalar {
    fn from(d: f64) -> Self {
        Scalar::Decimal(d)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

/// One row: fields in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Scalar)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
        self.fields.push((field.into(), value.into()));
    }

    /// First value stored under `field`.
    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A relational data source.
pub trait RowSource {
    /// Table names in materialization order.
    fn tables(&self) -> SourceResult<Vec<String>>;

    /// Rows of one table, in source order.
    fn rows(&self, table: &str) -> SourceResult<Vec<Row>>;
}

/// Tables held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: Vec<(String, Vec<Row>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, builder style.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.push((name.into(), rows));
        self
    }
}

impl RowSource for MemorySource {
    fn tables(&self) -> SourceResult<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| SourceError::TableNotFound {
                table: table.to_string(),
            })
    }
}

/// Open the source described by the `[source]` config section.
pub fn open(config: &SourceConfig) -> SourceResult<Box<dyn RowSource>> {
    match config.kind {
        SourceKind::Json => Ok(Box::new(json::JsonSource::open(&config.path)?)),
        SourceKind::Csv => Ok(Box::new(csv_dir::CsvDirSource::open(&config.path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_prefers_integer_then_decimal() {
        assert_eq!(Scalar::infer("42"), Scalar::Integer(42));
        assert_eq!(Scalar::infer("4.25"), Scalar::Decimal(4.25));
        assert_eq!(Scalar::infer("Delhi"), Scalar::String("Delhi".into()));
        assert_eq!(Scalar::infer("  "), Scalar::Null);
        assert_eq!(Scalar::infer("NaN"), Scalar::String("NaN".into()));
    }

    #[test]
    fn row_keeps_field_order() {
        let row = Row::new().with("id", 7i64).with("name", "x").with("score", 1.5);
        let names: Vec<_> = row.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "name", "score"]);
        assert_eq!(row.get("id"), Some(&Scalar::Integer(7)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn memory_source_lists_tables_in_order() {
        let source = MemorySource::new()
            .with_table("helplines", vec![Row::new().with("id", 1i64)])
            .with_table("shelters", vec![]);
        assert_eq!(source.tables().unwrap(), vec!["helplines", "shelters"]);
        assert_eq!(source.rows("helplines").unwrap().len(), 1);
        assert!(matches!(
            source.rows("nope"),
            Err(SourceError::TableNotFound { .. })
        ));
    }
}
