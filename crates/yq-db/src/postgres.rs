//! PostgreSQL platform
//!
//! Accepts libpq key/value strings (`host=... dbname=...`) and
//! `postgres://` URLs. The driver is `tokio-postgres` behind the `postgres`
//! feature; without it the platform still renders SQL but cannot connect.

use crate::connection_string::database_from_url;
use crate::error::{DbError, DbResult};
use crate::traits::{DbConnection, PlatformDataService, PlatformFlags, PlatformOptions, SqlTemplates};
use async_trait::async_trait;
use yq_sql::SeparatorRule;

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = '${YUNIQL_DB_NAME}')",
    create_database: "CREATE DATABASE \"${YUNIQL_DB_NAME}\"",
    check_schema_exists: "SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = '${YUNIQL_SCHEMA_NAME}')",
    create_schema: "CREATE SCHEMA IF NOT EXISTS \"${YUNIQL_SCHEMA_NAME}\"",
    check_table_exists: "SELECT EXISTS (SELECT 1 FROM pg_tables WHERE schemaname = '${YUNIQL_SCHEMA_NAME}' AND tablename = '${YUNIQL_TABLE_NAME}')",
    create_table: "CREATE TABLE \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" (
    sequence_id SERIAL PRIMARY KEY,
    version VARCHAR(190) NOT NULL,
    applied_on_utc TIMESTAMP WITHOUT TIME ZONE NOT NULL,
    applied_by_user VARCHAR(128) NOT NULL,
    applied_by_tool VARCHAR(32) NOT NULL,
    applied_by_tool_version VARCHAR(16) NOT NULL,
    status VARCHAR(32) NOT NULL,
    duration_ms BIGINT NOT NULL,
    checksum VARCHAR(64) NOT NULL,
    failed_script_path VARCHAR(4000) NULL,
    failed_script_error VARCHAR(4000) NULL,
    additional_artifacts VARCHAR(4000) NULL,
    CONSTRAINT ix_${YUNIQL_TABLE_NAME} UNIQUE (version)
)",
    get_current_version: "SELECT version FROM \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" WHERE status = 'Successful'",
    get_all_versions: "SELECT sequence_id, version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts FROM \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" ORDER BY sequence_id",
    insert_version: "INSERT INTO \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" (version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts) VALUES ('${YUNIQL_VERSION}', '${YUNIQL_APPLIED_ON_UTC}', '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', ''))",
    update_version: "UPDATE \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" SET applied_on_utc = '${YUNIQL_APPLIED_ON_UTC}', applied_by_user = '${YUNIQL_APPLIED_BY_USER}', applied_by_tool = '${YUNIQL_APPLIED_BY_TOOL}', applied_by_tool_version = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', status = '${YUNIQL_STATUS}', duration_ms = ${YUNIQL_DURATION_MS}, checksum = '${YUNIQL_CHECKSUM}', failed_script_path = NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), failed_script_error = NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), additional_artifacts = NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', '') WHERE version = '${YUNIQL_VERSION}'",
    clear_versions: "DELETE FROM \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\"",
};

/// Database name from a key/value string or URL
pub(crate) fn pg_database_name(platform: &str, raw: &str) -> DbResult<String> {
    if let Some(db) = database_from_url(raw) {
        return Ok(db);
    }
    let lookup = |key: &str| {
        raw.split_whitespace()
            .filter_map(|part| part.split_once('='))
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim_matches('\'').to_string())
            .filter(|v| !v.is_empty())
    };
    lookup("dbname")
        .or_else(|| lookup("user"))
        .ok_or_else(|| DbError::InvalidConnectionString {
            platform: platform.to_string(),
            message: "no dbname (or user) in connection string".to_string(),
        })
}

/// PostgreSQL platform
pub struct PostgresPlatform {
    options: PlatformOptions,
}

impl PostgresPlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        let platform = Self { options };
        platform.database_name()?;
        Ok(platform)
    }
}

#[async_trait]
impl PlatformDataService for PostgresPlatform {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn options(&self) -> &PlatformOptions {
        &self.options
    }

    fn flags(&self) -> PlatformFlags {
        PlatformFlags {
            atomic_ddl: true,
            schemas: true,
            batch_sql: true,
            default_schema: Some("public"),
        }
    }

    fn templates(&self) -> &'static SqlTemplates {
        &TEMPLATES
    }

    fn default_separator(&self) -> Option<SeparatorRule> {
        None
    }

    fn database_name(&self) -> DbResult<String> {
        pg_database_name(self.name(), &self.options.connection_string)
    }

    async fn connect(&self) -> DbResult<Box<dyn DbConnection>> {
        driver::connect(&self.options, None).await
    }

    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>> {
        driver::connect(&self.options, Some("postgres")).await
    }
}

#[cfg(feature = "postgres")]
pub(crate) mod driver {
    use crate::error::{DbError, DbResult, SqlFailure};
    use crate::traits::{DbConnection, PlatformOptions};
    use async_trait::async_trait;
    use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};

    /// Open a session, optionally against another database on the same server.
    pub(crate) async fn connect(
        options: &PlatformOptions,
        database: Option<&str>,
    ) -> DbResult<Box<dyn DbConnection>> {
        let raw = match database {
            Some(db) => crate::connection_string::replace_url_database(
                &options.connection_string,
                db,
            )
            .unwrap_or_else(|| options.connection_string.clone()),
            None => options.connection_string.clone(),
        };
        let mut config: Config = raw.parse().map_err(|e: tokio_postgres::Error| {
            DbError::InvalidConnectionString {
                platform: "postgresql".to_string(),
                message: e.to_string(),
            }
        })?;
        if let Some(db) = database {
            config.dbname(db);
        }

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("PostgreSQL connection closed with error: {}", e);
            }
        });

        let conn = PostgresConnection { client };
        conn.execute(&format!(
            "SET statement_timeout = {}",
            options.command_timeout_secs.saturating_mul(1000)
        ))
        .await?;
        Ok(Box::new(conn))
    }

    /// Normalise a driver error raised while running `statement`
    fn map_error(err: tokio_postgres::Error, statement: &str) -> DbError {
        if let Some(db) = err.as_db_error() {
            return DbError::Sql(SqlFailure {
                code: Some(db.code().code().to_string()),
                message: db.message().to_string(),
                statement: Some(statement.to_string()),
            });
        }
        if err.is_closed() {
            return DbError::ConnectionError(err.to_string());
        }
        DbError::sql(None, err.to_string(), statement)
    }

    pub(crate) struct PostgresConnection {
        client: Client,
    }

    impl PostgresConnection {
        async fn simple(&self, sql: &str) -> DbResult<Vec<SimpleQueryMessage>> {
            self.client
                .simple_query(sql)
                .await
                .map_err(|e| map_error(e, sql))
        }
    }

    #[async_trait]
    impl DbConnection for PostgresConnection {
        async fn execute(&self, sql: &str) -> DbResult<u64> {
            let affected = self
                .simple(sql)
                .await?
                .into_iter()
                .map(|msg| match msg {
                    SimpleQueryMessage::CommandComplete(n) => n,
                    _ => 0,
                })
                .sum();
            Ok(affected)
        }

        async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
            let rows = self
                .simple(sql)
                .await?
                .into_iter()
                .filter_map(|msg| match msg {
                    SimpleQueryMessage::Row(row) => Some(
                        (0..row.len())
                            .map(|i| row.get(i).map(str::to_string))
                            .collect(),
                    ),
                    _ => None,
                })
                .collect();
            Ok(rows)
        }

        async fn begin(&self) -> DbResult<()> {
            self.simple("BEGIN").await.map(|_| ())
        }

        async fn commit(&self) -> DbResult<()> {
            self.simple("COMMIT").await.map(|_| ())
        }

        async fn rollback(&self) -> DbResult<()> {
            self.simple("ROLLBACK").await.map(|_| ())
        }

        fn db_type(&self) -> &'static str {
            "postgresql"
        }
    }
}

#[cfg(not(feature = "postgres"))]
pub(crate) mod driver {
    use crate::error::DbResult;
    use crate::traits::{driver_not_available, DbConnection, PlatformOptions};

    pub(crate) async fn connect(
        _options: &PlatformOptions,
        _database: Option<&str>,
    ) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available("postgresql"))
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
