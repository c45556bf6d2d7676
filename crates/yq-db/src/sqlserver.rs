//! SQL Server platform
//!
//! Takes ADO connection strings (`Server=host,port;Database=...`). Scripts are
//! split on `GO`. The driver is `tiberius` behind the `sqlserver` feature;
//! without it the platform still renders SQL but cannot connect.

use crate::connection_string::{lookup, parse_pairs};
use crate::error::{DbError, DbResult};
use crate::traits::{DbConnection, PlatformDataService, PlatformFlags, PlatformOptions, SqlTemplates};
use async_trait::async_trait;
use yq_sql::SeparatorRule;

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT CASE WHEN DB_ID('${YUNIQL_DB_NAME}') IS NULL THEN 0 ELSE 1 END",
    create_database: "CREATE DATABASE [${YUNIQL_DB_NAME}];",
    check_schema_exists: "SELECT CASE WHEN SCHEMA_ID('${YUNIQL_SCHEMA_NAME}') IS NULL THEN 0 ELSE 1 END",
    create_schema: "CREATE SCHEMA [${YUNIQL_SCHEMA_NAME}];",
    check_table_exists: "SELECT CASE WHEN OBJECT_ID('[${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}]', 'U') IS NULL THEN 0 ELSE 1 END",
    create_table: "CREATE TABLE [${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}] (
    [sequence_id] INT IDENTITY(1,1) NOT NULL,
    [version] NVARCHAR(190) NOT NULL,
    [applied_on_utc] DATETIME NOT NULL,
    [applied_by_user] NVARCHAR(128) NOT NULL,
    [applied_by_tool] NVARCHAR(32) NOT NULL,
    [applied_by_tool_version] NVARCHAR(16) NOT NULL,
    [status] NVARCHAR(32) NOT NULL,
    [duration_ms] BIGINT NOT NULL,
    [checksum] NVARCHAR(64) NOT NULL,
    [failed_script_path] NVARCHAR(4000) NULL,
    [failed_script_error] NVARCHAR(4000) NULL,
    [additional_artifacts] NVARCHAR(4000) NULL,
    CONSTRAINT [PK_${YUNIQL_TABLE_NAME}] PRIMARY KEY CLUSTERED ([sequence_id] ASC),
    CONSTRAINT [IX_${YUNIQL_TABLE_NAME}] UNIQUE NONCLUSTERED ([version] ASC)
);",
    get_current_version: "SELECT [version] FROM [${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}] WHERE [status] = 'Successful';",
    get_all_versions: "SELECT [sequence_id], [version], [applied_on_utc], [applied_by_user], [applied_by_tool], [applied_by_tool_version], [status], [duration_ms], [checksum], [failed_script_path], [failed_script_error], [additional_artifacts] FROM [${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}] ORDER BY [sequence_id] ASC;",
    insert_version: "INSERT INTO [${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}] ([version], [applied_on_utc], [applied_by_user], [applied_by_tool], [applied_by_tool_version], [status], [duration_ms], [checksum], [failed_script_path], [failed_script_error], [additional_artifacts]) VALUES ('${YUNIQL_VERSION}', '${YUNIQL_APPLIED_ON_UTC}', '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', ''));",
    update_version: "UPDATE [${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}] SET [applied_on_utc] = '${YUNIQL_APPLIED_ON_UTC}', [applied_by_user] = '${YUNIQL_APPLIED_BY_USER}', [applied_by_tool] = '${YUNIQL_APPLIED_BY_TOOL}', [applied_by_tool_version] = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', [status] = '${YUNIQL_STATUS}', [duration_ms] = ${YUNIQL_DURATION_MS}, [checksum] = '${YUNIQL_CHECKSUM}', [failed_script_path] = NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), [failed_script_error] = NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), [additional_artifacts] = NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', '') WHERE [version] = '${YUNIQL_VERSION}';",
    clear_versions: "DELETE FROM [${YUNIQL_SCHEMA_NAME}].[${YUNIQL_TABLE_NAME}];",
};

/// SQL Server platform
pub struct SqlServerPlatform {
    options: PlatformOptions,
}

impl SqlServerPlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        let platform = Self { options };
        platform.database_name()?;
        Ok(platform)
    }
}

#[async_trait]
impl PlatformDataService for SqlServerPlatform {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn options(&self) -> &PlatformOptions {
        &self.options
    }

    fn flags(&self) -> PlatformFlags {
        PlatformFlags {
            atomic_ddl: true,
            schemas: true,
            batch_sql: true,
            default_schema: Some("dbo"),
        }
    }

    fn templates(&self) -> &'static SqlTemplates {
        &TEMPLATES
    }

    fn default_separator(&self) -> Option<SeparatorRule> {
        Some(SeparatorRule::go())
    }

    fn database_name(&self) -> DbResult<String> {
        let pairs = parse_pairs(&self.options.connection_string);
        lookup(&pairs, &["database", "initial catalog"])
            .map(str::to_string)
            .ok_or_else(|| DbError::InvalidConnectionString {
                platform: self.name().to_string(),
                message: "missing Database or Initial Catalog".to_string(),
            })
    }

    async fn connect(&self) -> DbResult<Box<dyn DbConnection>> {
        driver::connect(&self.options, None).await
    }

    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>> {
        driver::connect(&self.options, Some("master")).await
    }
}

#[cfg(feature = "sqlserver")]
pub(crate) mod driver {
    use crate::bulk;
    use crate::error::{DbError, DbResult, SqlFailure};
    use crate::traits::{DbConnection, PlatformOptions};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::path::Path;
    use std::time::Duration;
    use tiberius::error::Error as TdsError;
    use tiberius::{Client, ColumnData, Config, FromSql, Row};
    use tokio::net::TcpStream;
    use tokio::sync::Mutex;
    use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
    use yq_sql::quote::{escape_literal, quote_bracketed, quote_target};

    type TdsClient = Client<Compat<TcpStream>>;

    /// Open a session, optionally against another database on the same server.
    pub(crate) async fn connect(
        options: &PlatformOptions,
        database: Option<&str>,
    ) -> DbResult<Box<dyn DbConnection>> {
        let mut config = Config::from_ado_string(&options.connection_string).map_err(|e| {
            DbError::InvalidConnectionString {
                platform: "sqlserver".to_string(),
                message: e.to_string(),
            }
        })?;
        if let Some(db) = database {
            config.database(db);
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        tcp.set_nodelay(true).ok();
        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        Ok(Box::new(SqlServerConnection {
            client: Mutex::new(client),
            timeout: Duration::from_secs(options.command_timeout_secs),
        }))
    }

    /// Normalise a driver error raised while running `statement`
    pub(crate) fn map_error(err: TdsError, statement: &str) -> DbError {
        match &err {
            TdsError::Server(token) => DbError::Sql(SqlFailure {
                code: Some(token.code().to_string()),
                message: token.message().to_string(),
                statement: Some(statement.to_string()),
            }),
            TdsError::Io { .. } | TdsError::Tls(_) | TdsError::Routing { .. } => {
                DbError::ConnectionError(err.to_string())
            }
            _ => DbError::sql(None, err.to_string(), statement),
        }
    }

    /// Render a column value as text; NULL becomes `None`.
    pub(crate) fn cell_text(data: ColumnData<'static>) -> Option<String> {
        match data {
            ColumnData::U8(v) => v.map(|v| v.to_string()),
            ColumnData::I16(v) => v.map(|v| v.to_string()),
            ColumnData::I32(v) => v.map(|v| v.to_string()),
            ColumnData::I64(v) => v.map(|v| v.to_string()),
            ColumnData::F32(v) => v.map(|v| v.to_string()),
            ColumnData::F64(v) => v.map(|v| v.to_string()),
            ColumnData::Bit(v) => v.map(|b| String::from(if b { "1" } else { "0" })),
            ColumnData::String(v) => v.map(|s| s.into_owned()),
            ColumnData::Guid(v) => v.map(|g| g.to_string()),
            ColumnData::Numeric(v) => v.map(|n| n.to_string()),
            ColumnData::Binary(v) => v.map(|b| b.iter().map(|x| format!("{:02X}", x)).collect()),
            other => NaiveDateTime::from_sql(&other)
                .ok()
                .flatten()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
                .or_else(|| {
                    NaiveDate::from_sql(&other)
                        .ok()
                        .flatten()
                        .map(|d| d.to_string())
                }),
        }
    }

    fn n_literal(value: &str) -> String {
        format!("N'{}'", escape_literal(value))
    }

    pub(crate) struct SqlServerConnection {
        client: Mutex<TdsClient>,
        timeout: Duration,
    }

    impl SqlServerConnection {
        /// Send `sql` as one batch and collect every result set
        async fn batch(&self, sql: &str) -> DbResult<Vec<Vec<Row>>> {
            let mut client = self.client.lock().await;
            let run = async { client.simple_query(sql).await?.into_results().await };
            match tokio::time::timeout(self.timeout, run).await {
                Ok(result) => result.map_err(|e| map_error(e, sql)),
                Err(_) => Err(DbError::sql(
                    None,
                    format!("command timed out after {}s", self.timeout.as_secs()),
                    sql,
                )),
            }
        }
    }

    #[async_trait]
    impl DbConnection for SqlServerConnection {
        /// Batches go through the plain SQL batch path, which reports no row
        /// counts; always 0.
        async fn execute(&self, sql: &str) -> DbResult<u64> {
            self.batch(sql).await.map(|_| 0)
        }

        async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
            let first = self.batch(sql).await?.into_iter().next().unwrap_or_default();
            Ok(first
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect())
        }

        async fn begin(&self) -> DbResult<()> {
            self.batch("BEGIN TRANSACTION").await.map(|_| ())
        }

        async fn commit(&self) -> DbResult<()> {
            self.batch("COMMIT TRANSACTION").await.map(|_| ())
        }

        async fn rollback(&self) -> DbResult<()> {
            self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await.map(|_| ())
        }

        async fn bulk_import(&self, path: &Path, schema: Option<&str>, table: &str) -> DbResult<u64> {
            let target = quote_target(schema, table, quote_bracketed);
            let csv = bulk::read_csv(path, &target).await?;
            for statement in bulk::insert_statements(&target, &csv, quote_bracketed, n_literal) {
                self.batch(&statement).await.map_err(|e| DbError::BulkImport {
                    table: target.clone(),
                    message: e.to_string(),
                })?;
            }
            Ok(csv.rows.len() as u64)
        }

        fn db_type(&self) -> &'static str {
            "sqlserver"
        }
    }
}

#[cfg(not(feature = "sqlserver"))]
pub(crate) mod driver {
    use crate::error::DbResult;
    use crate::traits::{driver_not_available, DbConnection, PlatformOptions};

    pub(crate) async fn connect(
        _options: &PlatformOptions,
        _database: Option<&str>,
    ) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available("sqlserver"))
    }
}

#[cfg(test)]
#[path = "sqlserver_test.rs"]
mod tests;
