//! CSV directory source: each `<table>.csv` file is one table.
//!
//! The header row names the fields. Cells are typed integer → decimal →
//! string; an empty cell is null. Tables are listed in file-name order.

use std::path::{Path, PathBuf};

use crate::error::SourceError;

use super::{Row, RowSource, Scalar, SourceResult};

/// A directory of CSV tables.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
    tables: Vec<String>,
}

impl CsvDirSource {
    /// Scan `dir` for `*.csv` files.
    pub fn open(dir: &Path) -> SourceResult<Self> {
        let io_err = |e| SourceError::Io {
            path: dir.display().to_string(),
            source: e,
        };
        let mut tables: Vec<String> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|p| p.file_stem()?.to_str().map(str::to_string))
            .collect();
        tables.sort();
        Ok(Self {
            dir: dir.to_path_buf(),
            tables,
        })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }
}

impl RowSource for CsvDirSource {
    fn tables(&self) -> SourceResult<Vec<String>> {
        Ok(self.tables.clone())
    }

    fn rows(&self, table: &str) -> SourceResult<Vec<Row>> {
        if !self.tables.iter().any(|t| t == table) {
            return Err(SourceError::TableNotFound {
                table: table.to_string(),
            });
        }
        let path = self.table_path(table);
        let parse_err = |e: csv::Error| SourceError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(parse_err)?;
        let headers = reader.headers().map_err(parse_err)?.clone();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(table, line, error = %e, "skipping malformed CSV record");
                    continue;
                }
            };
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(field, cell)| (field.trim().to_string(), Scalar::infer(cell)))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn lists_csv_files_as_tables() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "shelters.csv", "id,name\n1,Home\n");
        write(dir.path(), "helplines.csv", "id,number\n1,1091\n");
        write(dir.path(), "notes.txt", "ignored");

        let source = CsvDirSource::open(dir.path()).unwrap();
        assert_eq!(source.tables().unwrap(), vec!["helplines", "shelters"]);
    }

    #[test]
    fn cells_are_typed_and_empty_is_null() {
        let dir = tempfile::TempDir::new().unwrap();
        write(
            dir.path(),
            "stations.csv",
            "id,name,lat,phone\n5,\"Central, Delhi\",28.6,\n",
        );

        let source = CsvDirSource::open(dir.path()).unwrap();
        let rows = source.rows("stations").unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("id"), Some(&Scalar::Integer(5)));
        assert_eq!(row.get("name"), Some(&Scalar::String("Central, Delhi".into())));
        assert_eq!(row.get("lat"), Some(&Scalar::Decimal(28.6)));
        assert_eq!(row.get("phone"), Some(&Scalar::Null));
    }

    #[test]
    fn unknown_table_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = CsvDirSource::open(dir.path()).unwrap();
        assert!(matches!(
            source.rows("missing"),
            Err(SourceError::TableNotFound { .. })
        ));
    }
}
