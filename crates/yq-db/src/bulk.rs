//! CSV loading for drivers without a native bulk path
//!
//! DuckDB parses the file; the rows are then sent to the target as
//! multi-row `INSERT` statements rendered in the target's quoting style.

use crate::duckdb::DuckDbPlatform;
use crate::error::{DbError, DbResult};
use crate::traits::{PlatformDataService, PlatformOptions};
use std::path::Path;
use yq_sql::quote::escape_literal;

/// Rows per `INSERT` (SQL Server's ceiling for a `VALUES` list)
pub(crate) const ROWS_PER_INSERT: usize = 1000;

/// A CSV file read as text cells
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CsvTable {
    /// Header names in file order
    pub columns: Vec<String>,
    /// Data rows; empty fields are `None`
    pub rows: Vec<Vec<Option<String>>>,
}

/// Read a CSV file with a header row, keeping every value as text.
pub(crate) async fn read_csv(path: &Path, target: &str) -> DbResult<CsvTable> {
    let failed = |message: String| DbError::BulkImport {
        table: target.to_string(),
        message,
    };
    let reader = DuckDbPlatform::new(PlatformOptions::new(":memory:"))?;
    let conn = reader.connect().await?;
    let source = format!(
        "SELECT * FROM read_csv('{}', header = true, all_varchar = true)",
        escape_literal(&path.to_string_lossy())
    );

    let columns = conn
        .query_rows(&format!("DESCRIBE {}", source))
        .await
        .map_err(|e| failed(e.to_string()))?
        .into_iter()
        .filter_map(|row| row.into_iter().next().flatten())
        .collect::<Vec<_>>();
    if columns.is_empty() {
        return Err(failed(format!("'{}' has no header row", path.display())));
    }
    let rows = conn
        .query_rows(&source)
        .await
        .map_err(|e| failed(e.to_string()))?;
    Ok(CsvTable { columns, rows })
}

/// Render `csv` as `INSERT` statements against `target`.
///
/// `quote` quotes a column name; `literal` renders a non-NULL value.
pub(crate) fn insert_statements(
    target: &str,
    csv: &CsvTable,
    quote: fn(&str) -> String,
    literal: fn(&str) -> String,
) -> Vec<String> {
    let columns = csv
        .columns
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    csv.rows
        .chunks(ROWS_PER_INSERT)
        .map(|chunk| {
            let values = chunk
                .iter()
                .map(|row| {
                    let cells = row
                        .iter()
                        .map(|cell| cell.as_deref().map_or_else(|| "NULL".to_string(), literal))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({})", cells)
                })
                .collect::<Vec<_>>()
                .join(",\n");
            format!("INSERT INTO {} ({}) VALUES\n{}", target, columns, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yq_sql::quote::quote_bracketed;

    fn n_literal(value: &str) -> String {
        format!("N'{}'", escape_literal(value))
    }

    #[tokio::test]
    async fn test_read_csv_keeps_text_and_nulls() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("regions.csv");
        std::fs::write(&path, "id,name\n1,north\n2,\n003,o'neil\n").unwrap();

        let csv = read_csv(&path, "regions").await.unwrap();
        assert_eq!(csv.columns, vec!["id", "name"]);
        assert_eq!(
            csv.rows,
            vec![
                vec![Some("1".to_string()), Some("north".to_string())],
                vec![Some("2".to_string()), None],
                vec![Some("003".to_string()), Some("o'neil".to_string())],
            ]
        );
    }

    #[tokio::test]
    async fn test_read_csv_missing_file() {
        let err = read_csv(Path::new("/nonexistent/x.csv"), "x").await.unwrap_err();
        assert!(matches!(err, DbError::BulkImport { ref table, .. } if table == "x"));
    }

    #[test]
    fn test_insert_statements_chunk_and_quote() {
        let csv = CsvTable {
            columns: vec!["id".to_string(), "odd]name".to_string()],
            rows: (0..ROWS_PER_INSERT + 1)
                .map(|i| vec![Some(i.to_string()), None])
                .collect(),
        };
        let statements = insert_statements("[dbo].[t]", &csv, quote_bracketed, n_literal);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("INSERT INTO [dbo].[t] ([id], [odd]]name]) VALUES\n(N'0', NULL),"));
        assert_eq!(
            statements[1],
            format!("INSERT INTO [dbo].[t] ([id], [odd]]name]) VALUES\n(N'{}', NULL)", ROWS_PER_INSERT)
        );
    }
}
