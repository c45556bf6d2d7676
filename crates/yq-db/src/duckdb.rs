//! DuckDB platform
//!
//! The connection string is a database file path or `:memory:`. DuckDB allows
//! one database instance per file within a process, so the platform keeps a
//! root connection and every [`connect`](PlatformDataService::connect) hands
//! out a clone of it. For `:memory:` this also means all connections of one
//! platform instance see the same database.

use crate::error::{from_duckdb, DbError, DbResult};
use crate::traits::{DbConnection, PlatformDataService, PlatformFlags, PlatformOptions, SqlTemplates};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use std::path::Path;
use std::sync::Mutex;
use yq_sql::quote::{escape_literal, quote_ident, quote_target};
use yq_sql::SeparatorRule;

const IN_MEMORY: &str = ":memory:";

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT COUNT(*) > 0 FROM duckdb_databases() WHERE database_name = '${YUNIQL_DB_NAME}'",
    create_database: "CHECKPOINT",
    check_schema_exists: "SELECT COUNT(*) > 0 FROM information_schema.schemata WHERE schema_name = '${YUNIQL_SCHEMA_NAME}'",
    create_schema: "CREATE SCHEMA IF NOT EXISTS ${YUNIQL_SCHEMA_NAME}",
    check_table_exists: "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_schema = '${YUNIQL_SCHEMA_NAME}' AND table_name = '${YUNIQL_TABLE_NAME}'",
    create_table: "CREATE SEQUENCE IF NOT EXISTS ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME}_seq START 1;
CREATE TABLE ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME} (
    sequence_id BIGINT PRIMARY KEY DEFAULT nextval('${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME}_seq'),
    version VARCHAR NOT NULL,
    applied_on_utc TIMESTAMP NOT NULL,
    applied_by_user VARCHAR NOT NULL,
    applied_by_tool VARCHAR NOT NULL,
    applied_by_tool_version VARCHAR NOT NULL,
    status VARCHAR NOT NULL,
    duration_ms BIGINT NOT NULL,
    checksum VARCHAR NOT NULL,
    failed_script_path VARCHAR,
    failed_script_error VARCHAR,
    additional_artifacts VARCHAR
);",
    get_current_version: "SELECT version FROM ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME} WHERE status = 'Successful'",
    get_all_versions: "SELECT sequence_id, version, CAST(applied_on_utc AS VARCHAR), applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts FROM ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME} ORDER BY sequence_id",
    insert_version: "INSERT INTO ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME} (version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts) VALUES ('${YUNIQL_VERSION}', CAST('${YUNIQL_APPLIED_ON_UTC}' AS TIMESTAMP), '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', ''))",
    update_version: "UPDATE ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME} SET applied_on_utc = CAST('${YUNIQL_APPLIED_ON_UTC}' AS TIMESTAMP), applied_by_user = '${YUNIQL_APPLIED_BY_USER}', applied_by_tool = '${YUNIQL_APPLIED_BY_TOOL}', applied_by_tool_version = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', status = '${YUNIQL_STATUS}', duration_ms = ${YUNIQL_DURATION_MS}, checksum = '${YUNIQL_CHECKSUM}', failed_script_path = NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), failed_script_error = NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), additional_artifacts = NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', '') WHERE version = '${YUNIQL_VERSION}'",
    clear_versions: "DELETE FROM ${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME}",
};

/// DuckDB platform
pub struct DuckDbPlatform {
    options: PlatformOptions,
    root: Mutex<Option<Connection>>,
}

impl DuckDbPlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        if options.connection_string.trim().is_empty() {
            return Err(DbError::InvalidConnectionString {
                platform: "duckdb".to_string(),
                message: "expected a database file path or :memory:".to_string(),
            });
        }
        Ok(Self {
            options,
            root: Mutex::new(None),
        })
    }

    fn path(&self) -> &str {
        self.options.connection_string.trim()
    }

    fn is_in_memory(&self) -> bool {
        self.path() == IN_MEMORY
    }

    /// Clone of the root connection, opening it on first use.
    fn clone_root(&self) -> DbResult<Connection> {
        let mut guard = self
            .root
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        if let Some(conn) = guard.as_ref() {
            return conn
                .try_clone()
                .map_err(|e| DbError::ConnectionError(e.to_string()));
        }

        let conn = if self.is_in_memory() {
            Connection::open_in_memory()
        } else {
            Connection::open(Path::new(self.path()))
        }
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let cloned = conn
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        *guard = Some(conn);
        log::debug!("Opened DuckDB database {}", self.path());
        Ok(cloned)
    }
}

#[async_trait]
impl PlatformDataService for DuckDbPlatform {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn options(&self) -> &PlatformOptions {
        &self.options
    }

    fn flags(&self) -> PlatformFlags {
        PlatformFlags {
            atomic_ddl: true,
            schemas: true,
            batch_sql: false,
            default_schema: Some("main"),
        }
    }

    fn templates(&self) -> &'static SqlTemplates {
        &TEMPLATES
    }

    fn default_separator(&self) -> Option<SeparatorRule> {
        Some(SeparatorRule::semicolon())
    }

    fn database_name(&self) -> DbResult<String> {
        if self.is_in_memory() {
            return Ok("memory".to_string());
        }
        Path::new(self.path())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| DbError::InvalidConnectionString {
                platform: "duckdb".to_string(),
                message: format!("'{}' has no file name", self.path()),
            })
    }

    async fn connect(&self) -> DbResult<Box<dyn DbConnection>> {
        Ok(Box::new(DuckDbConnection::new(self.clone_root()?)))
    }

    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>> {
        self.connect().await
    }

    /// A file database exists when its file does; `:memory:` always exists.
    async fn database_exists(&self) -> DbResult<bool> {
        Ok(self.is_in_memory() || Path::new(self.path()).is_file())
    }

    /// Opening a file database creates it.
    async fn create_database(&self) -> DbResult<()> {
        let conn = self.connect().await?;
        conn.execute(&self.sql_for_create_database()?).await?;
        log::info!("Created DuckDB database {}", self.path());
        Ok(())
    }
}

/// One DuckDB session
pub struct DuckDbConnection {
    conn: Mutex<Connection>,
}

impl DuckDbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> DbResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<u64> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(|e| from_duckdb(e, sql))?;
        Ok(0)
    }

    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| from_duckdb(e, sql))?;
        let mut rows = stmt.query([]).map_err(|e| from_duckdb(e, sql))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| from_duckdb(e, sql))? {
            let mut cells = Vec::new();
            let mut idx = 0;
            loop {
                match row.get::<_, Value>(idx) {
                    Ok(value) => cells.push(value_to_text(value)),
                    Err(duckdb::Error::InvalidColumnIndex(_)) => break,
                    Err(e) => return Err(from_duckdb(e, sql)),
                }
                idx += 1;
            }
            out.push(cells);
        }
        Ok(out)
    }

    fn bulk_import_sync(&self, path: &Path, schema: Option<&str>, table: &str) -> DbResult<u64> {
        let target = quote_target(schema, table, quote_ident);
        let sql = format!(
            "INSERT INTO {} SELECT * FROM read_csv_auto('{}', header = true)",
            target,
            escape_literal(&path.to_string_lossy())
        );
        let conn = self.lock()?;
        let loaded = conn.execute(&sql, []).map_err(|e| DbError::BulkImport {
            table: target.clone(),
            message: e.to_string(),
        })?;
        Ok(loaded as u64)
    }
}

/// Render a DuckDB value as text; NULL becomes `None`.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Boolean(b) => Some(b.to_string()),
        Value::TinyInt(v) => Some(v.to_string()),
        Value::SmallInt(v) => Some(v.to_string()),
        Value::Int(v) => Some(v.to_string()),
        Value::BigInt(v) => Some(v.to_string()),
        Value::HugeInt(v) => Some(v.to_string()),
        Value::UTinyInt(v) => Some(v.to_string()),
        Value::USmallInt(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::UBigInt(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        Value::Text(s) => Some(s),
        other => Some(format!("{:?}", other)),
    }
}

#[async_trait]
impl DbConnection for DuckDbConnection {
    /// DuckDB reports no row count for multi-statement batches; always 0.
    async fn execute(&self, sql: &str) -> DbResult<u64> {
        self.execute_sync(sql)
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
        self.query_rows_sync(sql)
    }

    async fn begin(&self) -> DbResult<()> {
        self.execute_sync("BEGIN TRANSACTION").map(|_| ())
    }

    async fn commit(&self) -> DbResult<()> {
        self.execute_sync("COMMIT").map(|_| ())
    }

    async fn rollback(&self) -> DbResult<()> {
        self.execute_sync("ROLLBACK").map(|_| ())
    }

    async fn bulk_import(&self, path: &Path, schema: Option<&str>, table: &str) -> DbResult<u64> {
        self.bulk_import_sync(path, schema, table)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
