//! MySQL platform
//!
//! MySQL treats a database as its schema, so the metadata table sits directly
//! in the target database. DDL commits implicitly; scripts are sent whole.
//! The driver is `sqlx` behind the `mysql` feature.

use crate::connection_string::{lookup, parse_pairs};
use crate::error::{DbError, DbResult};
use crate::traits::{DbConnection, PlatformDataService, PlatformFlags, PlatformOptions, SqlTemplates};
use async_trait::async_trait;
use yq_sql::SeparatorRule;

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT 1 FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = '${YUNIQL_DB_NAME}';",
    create_database: "CREATE DATABASE `${YUNIQL_DB_NAME}`;",
    check_schema_exists: "SELECT 1 FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = '${YUNIQL_SCHEMA_NAME}';",
    create_schema: "CREATE SCHEMA `${YUNIQL_SCHEMA_NAME}`;",
    check_table_exists: "SELECT 1 FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = '${YUNIQL_DB_NAME}' AND TABLE_NAME = '${YUNIQL_TABLE_NAME}' LIMIT 1;",
    create_table: "CREATE TABLE `${YUNIQL_TABLE_NAME}` (
    sequence_id INT AUTO_INCREMENT PRIMARY KEY NOT NULL,
    version VARCHAR(190) NOT NULL,
    applied_on_utc TIMESTAMP(3) NOT NULL,
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
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;",
    get_current_version: "SELECT version FROM `${YUNIQL_TABLE_NAME}` WHERE status = 'Successful';",
    get_all_versions: "SELECT sequence_id, version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts FROM `${YUNIQL_TABLE_NAME}` ORDER BY sequence_id ASC;",
    insert_version: "INSERT INTO `${YUNIQL_TABLE_NAME}` (version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts) VALUES ('${YUNIQL_VERSION}', '${YUNIQL_APPLIED_ON_UTC}', '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', ''));",
    update_version: "UPDATE `${YUNIQL_TABLE_NAME}` SET applied_on_utc = '${YUNIQL_APPLIED_ON_UTC}', applied_by_user = '${YUNIQL_APPLIED_BY_USER}', applied_by_tool = '${YUNIQL_APPLIED_BY_TOOL}', applied_by_tool_version = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', status = '${YUNIQL_STATUS}', duration_ms = ${YUNIQL_DURATION_MS}, checksum = '${YUNIQL_CHECKSUM}', failed_script_path = NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), failed_script_error = NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), additional_artifacts = NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', '') WHERE version = '${YUNIQL_VERSION}';",
    clear_versions: "DELETE FROM `${YUNIQL_TABLE_NAME}`;",
};

/// MySQL / MariaDB platform
pub struct MySqlPlatform {
    options: PlatformOptions,
}

impl MySqlPlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        let platform = Self { options };
        platform.database_name()?;
        Ok(platform)
    }
}

#[async_trait]
impl PlatformDataService for MySqlPlatform {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn options(&self) -> &PlatformOptions {
        &self.options
    }

    fn flags(&self) -> PlatformFlags {
        PlatformFlags {
            atomic_ddl: false,
            schemas: false,
            batch_sql: true,
            default_schema: None,
        }
    }

    fn templates(&self) -> &'static SqlTemplates {
        &TEMPLATES
    }

    fn default_separator(&self) -> Option<SeparatorRule> {
        None
    }

    fn database_name(&self) -> DbResult<String> {
        let pairs = parse_pairs(&self.options.connection_string);
        lookup(&pairs, &["database", "db"])
            .map(str::to_string)
            .ok_or_else(|| DbError::InvalidConnectionString {
                platform: self.name().to_string(),
                message: "missing Database".to_string(),
            })
    }

    async fn connect(&self) -> DbResult<Box<dyn DbConnection>> {
        driver::connect(&self.options, None).await
    }

    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>> {
        driver::connect(&self.options, Some("information_schema")).await
    }
}

#[cfg(feature = "mysql")]
pub(crate) mod driver {
    use crate::bulk;
    use crate::connection_string::{lookup, parse_pairs};
    use crate::error::{DbError, DbResult, SqlFailure};
    use crate::traits::{DbConnection, PlatformOptions};
    use async_trait::async_trait;
    use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError};
    use sqlx::{ConnectOptions, Executor, Row};
    use std::future::Future;
    use std::path::Path;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use yq_sql::quote::{quote_backtick, quote_target};

    fn invalid(message: String) -> DbError {
        DbError::InvalidConnectionString {
            platform: "mysql".to_string(),
            message,
        }
    }

    /// Build driver options from a `mysql://` URL or an ADO string
    /// (`Server=...;Port=...;Database=...;Uid=...;Pwd=...`).
    pub(crate) fn connect_options(
        raw: &str,
        database: Option<&str>,
    ) -> DbResult<MySqlConnectOptions> {
        let trimmed = raw.trim();
        let options = if trimmed.starts_with("mysql://") || trimmed.starts_with("mariadb://") {
            trimmed
                .parse::<MySqlConnectOptions>()
                .map_err(|e| invalid(e.to_string()))?
        } else {
            let pairs = parse_pairs(trimmed);
            let mut options = MySqlConnectOptions::new();
            if let Some(host) = lookup(&pairs, &["server", "host", "data source"]) {
                options = options.host(host);
            }
            if let Some(port) = lookup(&pairs, &["port"]) {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid(format!("invalid port '{}'", port)))?;
                options = options.port(port);
            }
            if let Some(user) = lookup(&pairs, &["uid", "user id", "user", "username"]) {
                options = options.username(user);
            }
            if let Some(password) = lookup(&pairs, &["pwd", "password"]) {
                options = options.password(password);
            }
            if let Some(db) = lookup(&pairs, &["database", "db"]) {
                options = options.database(db);
            }
            options
        };
        let options = match database {
            Some(db) => options.database(db),
            None => options,
        };
        Ok(options.log_statements(log::LevelFilter::Debug))
    }

    /// Open a session, optionally against another database on the same server.
    pub(crate) async fn connect(
        options: &PlatformOptions,
        database: Option<&str>,
    ) -> DbResult<Box<dyn DbConnection>> {
        let conn = connect_options(&options.connection_string, database)?
            .connect()
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Box::new(MySqlSession {
            conn: Mutex::new(conn),
            timeout: Duration::from_secs(options.command_timeout_secs),
        }))
    }

    /// Normalise a driver error raised while running `statement`.
    ///
    /// Server errors carry the MySQL error number as their code.
    pub(crate) fn map_error(err: sqlx::Error, statement: &str) -> DbError {
        match err {
            sqlx::Error::Database(db) => {
                let code = db
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .map(|e| e.number().to_string())
                    .or_else(|| db.code().map(|c| c.into_owned()));
                DbError::Sql(SqlFailure {
                    code,
                    message: db.message().to_string(),
                    statement: Some(statement.to_string()),
                })
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => DbError::ConnectionError(err.to_string()),
            other => DbError::sql(None, other.to_string(), statement),
        }
    }

    fn escaped_literal(value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    pub(crate) struct MySqlSession {
        conn: Mutex<MySqlConnection>,
        timeout: Duration,
    }

    impl MySqlSession {
        async fn timed<T>(
            &self,
            sql: &str,
            run: impl Future<Output = Result<T, sqlx::Error>>,
        ) -> DbResult<T> {
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
    impl DbConnection for MySqlSession {
        async fn execute(&self, sql: &str) -> DbResult<u64> {
            let mut conn = self.conn.lock().await;
            let done = self
                .timed(sql, Executor::execute(&mut *conn, sqlx::raw_sql(sql)))
                .await?;
            Ok(done.rows_affected())
        }

        async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>> {
            let mut conn = self.conn.lock().await;
            let rows = self
                .timed(sql, Executor::fetch_all(&mut *conn, sqlx::raw_sql(sql)))
                .await?;
            rows.iter()
                .map(|row| {
                    (0..row.len())
                        .map(|i| row.try_get_unchecked::<Option<String>, _>(i))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| map_error(e, sql))
                })
                .collect()
        }

        async fn begin(&self) -> DbResult<()> {
            self.execute("START TRANSACTION").await.map(|_| ())
        }

        async fn commit(&self) -> DbResult<()> {
            self.execute("COMMIT").await.map(|_| ())
        }

        async fn rollback(&self) -> DbResult<()> {
            self.execute("ROLLBACK").await.map(|_| ())
        }

        async fn bulk_import(&self, path: &Path, schema: Option<&str>, table: &str) -> DbResult<u64> {
            let target = quote_target(schema, table, quote_backtick);
            let csv = bulk::read_csv(path, &target).await?;
            let mut loaded = 0;
            for statement in bulk::insert_statements(&target, &csv, quote_backtick, escaped_literal) {
                loaded += self.execute(&statement).await.map_err(|e| DbError::BulkImport {
                    table: target.clone(),
                    message: e.to_string(),
                })?;
            }
            Ok(loaded)
        }

        fn db_type(&self) -> &'static str {
            "mysql"
        }
    }

}

#[cfg(not(feature = "mysql"))]
pub(crate) mod driver {
    use crate::error::DbResult;
    use crate::traits::{driver_not_available, DbConnection, PlatformOptions};

    pub(crate) async fn connect(
        _options: &PlatformOptions,
        _database: Option<&str>,
    ) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available("mysql"))
    }
}
