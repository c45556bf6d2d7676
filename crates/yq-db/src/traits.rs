//! Connection and platform traits

use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use yq_core::record::{format_timestamp, AppliedVersionRecord};
use yq_sql::quote::escape_literal;
use yq_sql::tokens::{self, reserved};
use yq_sql::SeparatorRule;

/// One open database session.
///
/// Rows come back as text cells so the engine never depends on driver value
/// types. Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait DbConnection: Send + Sync {
    /// Execute a statement, returning affected rows where the driver reports them
    async fn execute(&self, sql: &str) -> DbResult<u64>;

    /// Run a query and return every row as text cells (`None` for NULL)
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<Option<String>>>>;

    /// First column of the first row
    async fn query_string(&self, sql: &str) -> DbResult<Option<String>> {
        let rows = self.query_rows(sql).await?;
        Ok(rows.into_iter().next().and_then(|row| row.into_iter().next().flatten()))
    }

    /// First column of the first row read as a boolean; no rows is `false`
    async fn query_bool(&self, sql: &str) -> DbResult<bool> {
        Ok(self
            .query_string(sql)
            .await?
            .map(|v| parse_bool(&v))
            .unwrap_or(false))
    }

    async fn begin(&self) -> DbResult<()>;

    async fn commit(&self) -> DbResult<()>;

    async fn rollback(&self) -> DbResult<()>;

    /// Load a CSV file into an existing table, returning rows loaded
    async fn bulk_import(&self, _path: &Path, _schema: Option<&str>, _table: &str) -> DbResult<u64> {
        Err(DbError::CapabilityNotSupported {
            platform: self.db_type().to_string(),
            capability: "bulk import".to_string(),
        })
    }

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Read a boolean the way drivers render one as text
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "t" | "true" | "1" | "y" | "yes"
    )
}

/// Static facts about a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformFlags {
    pub atomic_ddl: bool,
    pub schemas: bool,
    pub batch_sql: bool,
    /// Schema the metadata table lives in unless overridden
    pub default_schema: Option<&'static str>,
}

/// Capability flags plus the effective metadata location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCapabilities {
    pub is_atomic_ddl_supported: bool,
    pub is_schema_supported: bool,
    pub is_batch_sql_supported: bool,
    pub meta_schema_name: Option<String>,
    pub meta_table_name: String,
}

/// Settings shared by every platform
#[derive(Debug, Clone)]
pub struct PlatformOptions {
    pub connection_string: String,
    /// Metadata schema override
    pub meta_schema: Option<String>,
    pub meta_table: String,
    pub command_timeout_secs: u64,
    /// Replaces the dialect's own separator rule
    pub separator: Option<SeparatorRule>,
}

impl PlatformOptions {
    /// Options with default metadata location and timeout
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            meta_schema: None,
            meta_table: yq_core::config::DEFAULT_META_TABLE.to_string(),
            command_timeout_secs: yq_core::config::DEFAULT_COMMAND_TIMEOUT_SECS,
            separator: None,
        }
    }
}

/// Dialect SQL for the metadata lifecycle.
///
/// Templates use `${YUNIQL_DB_NAME}`, `${YUNIQL_SCHEMA_NAME}` and
/// `${YUNIQL_TABLE_NAME}`; the insert and update templates additionally use
/// the record tokens produced by [`record_tokens`]. The version queries select
/// the columns in [`yq_core::record::RECORD_COLUMNS`] order.
#[derive(Debug)]
pub struct SqlTemplates {
    pub check_database_exists: &'static str,
    pub create_database: &'static str,
    pub check_schema_exists: &'static str,
    pub create_schema: &'static str,
    pub check_table_exists: &'static str,
    pub create_table: &'static str,
    pub get_current_version: &'static str,
    pub get_all_versions: &'static str,
    pub insert_version: &'static str,
    pub update_version: &'static str,
    pub clear_versions: &'static str,
}

/// Token values for one metadata row, escaped for string literals
pub fn record_tokens(record: &AppliedVersionRecord) -> Vec<(String, String)> {
    let opt = |v: &Option<String>| escape_literal(v.as_deref().unwrap_or_default());
    tokens::pairs([
        (reserved::VERSION, record.version.to_string()),
        (
            reserved::APPLIED_ON_UTC,
            format_timestamp(&record.applied_on_utc),
        ),
        (reserved::APPLIED_BY_USER, escape_literal(&record.applied_by_user)),
        (reserved::APPLIED_BY_TOOL, escape_literal(&record.applied_by_tool)),
        (
            reserved::APPLIED_BY_TOOL_VERSION,
            escape_literal(&record.applied_by_tool_version),
        ),
        (reserved::STATUS, record.status.to_string()),
        (reserved::DURATION_MS, record.duration_ms.to_string()),
        (reserved::CHECKSUM, escape_literal(&record.checksum)),
        (reserved::FAILED_SCRIPT_PATH, opt(&record.failed_script_path)),
        (reserved::FAILED_SCRIPT_ERROR, opt(&record.failed_script_error)),
        (
            reserved::ADDITIONAL_ARTIFACTS,
            opt(&record.additional_artifacts),
        ),
    ])
}

/// Dialect abstraction: capabilities, SQL templates, statement splitting and
/// connections.
///
/// A platform never runs SQL on a connection of its own choosing except in
/// [`database_exists`](Self::database_exists) and
/// [`create_database`](Self::create_database), which need the server-level
/// (master) connection. Everything else is rendered here and executed by the
/// caller on the connection or transaction it owns.
#[async_trait]
pub trait PlatformDataService: Send + Sync {
    /// Registry name
    fn name(&self) -> &'static str;

    fn options(&self) -> &PlatformOptions;

    fn flags(&self) -> PlatformFlags;

    fn templates(&self) -> &'static SqlTemplates;

    /// The dialect's own separator rule; `None` sends scripts whole
    fn default_separator(&self) -> Option<SeparatorRule>;

    /// Target database name taken from the connection string
    fn database_name(&self) -> DbResult<String>;

    /// Connect to the target database
    async fn connect(&self) -> DbResult<Box<dyn DbConnection>>;

    /// Connect at server level, for database existence checks and creation
    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>>;

    fn capabilities(&self) -> PlatformCapabilities {
        let flags = self.flags();
        PlatformCapabilities {
            is_atomic_ddl_supported: flags.atomic_ddl,
            is_schema_supported: flags.schemas,
            is_batch_sql_supported: flags.batch_sql,
            meta_schema_name: self.schema_name(),
            meta_table_name: self.options().meta_table.clone(),
        }
    }

    /// Effective metadata schema; `None` when the dialect has no schemas
    fn schema_name(&self) -> Option<String> {
        let flags = self.flags();
        if !flags.schemas {
            return None;
        }
        self.options()
            .meta_schema
            .clone()
            .or_else(|| flags.default_schema.map(str::to_string))
    }

    fn separator_rule(&self) -> Option<SeparatorRule> {
        self.options()
            .separator
            .clone()
            .or_else(|| self.default_separator())
    }

    /// Split a script into executable units.
    fn break_statements(&self, raw: &str) -> Vec<String> {
        match self.separator_rule() {
            Some(rule) => yq_sql::split(raw, &rule)
                .into_iter()
                .map(|b| b.text)
                .collect(),
            None if raw.is_empty() => Vec::new(),
            None => vec![raw.to_string()],
        }
    }

    /// Database, schema and table tokens
    fn base_tokens(&self) -> DbResult<Vec<(String, String)>> {
        Ok(tokens::pairs([
            (reserved::DB_NAME, self.database_name()?),
            (reserved::SCHEMA_NAME, self.schema_name().unwrap_or_default()),
            (reserved::TABLE_NAME, self.options().meta_table.clone()),
        ]))
    }

    /// Substitute base tokens followed by `extra` into `template`
    fn render(&self, template: &str, extra: &[(String, String)]) -> DbResult<String> {
        let mut all = self.base_tokens()?;
        all.extend_from_slice(extra);
        Ok(tokens::replace(&all, template))
    }

    fn sql_for_check_if_database_exists(&self) -> DbResult<String> {
        self.render(self.templates().check_database_exists, &[])
    }

    fn sql_for_create_database(&self) -> DbResult<String> {
        self.render(self.templates().create_database, &[])
    }

    fn sql_for_check_if_schema_exists(&self) -> DbResult<String> {
        self.require_schemas()?;
        self.render(self.templates().check_schema_exists, &[])
    }

    fn sql_for_create_schema(&self) -> DbResult<String> {
        self.require_schemas()?;
        self.render(self.templates().create_schema, &[])
    }

    fn sql_for_check_if_database_configured(&self) -> DbResult<String> {
        self.render(self.templates().check_table_exists, &[])
    }

    fn sql_for_configure_database(&self) -> DbResult<String> {
        self.render(self.templates().create_table, &[])
    }

    fn sql_for_get_current_version(&self) -> DbResult<String> {
        self.render(self.templates().get_current_version, &[])
    }

    fn sql_for_get_all_versions(&self) -> DbResult<String> {
        self.render(self.templates().get_all_versions, &[])
    }

    fn sql_for_insert_version(&self, record: &AppliedVersionRecord) -> DbResult<String> {
        self.render(self.templates().insert_version, &record_tokens(record))
    }

    fn sql_for_update_version(&self, record: &AppliedVersionRecord) -> DbResult<String> {
        self.render(self.templates().update_version, &record_tokens(record))
    }

    fn sql_for_clear_versions(&self) -> DbResult<String> {
        self.render(self.templates().clear_versions, &[])
    }

    fn require_schemas(&self) -> DbResult<()> {
        if self.flags().schemas {
            Ok(())
        } else {
            Err(DbError::CapabilityNotSupported {
                platform: self.name().to_string(),
                capability: "schemas".to_string(),
            })
        }
    }

    /// Whether the target database exists
    async fn database_exists(&self) -> DbResult<bool> {
        let sql = self.sql_for_check_if_database_exists()?;
        let conn = self.connect_master().await?;
        conn.query_bool(&sql).await
    }

    /// Create the target database
    async fn create_database(&self) -> DbResult<()> {
        let sql = self.sql_for_create_database()?;
        let conn = self.connect_master().await?;
        conn.execute(&sql).await?;
        log::info!("Created database '{}'", self.database_name()?);
        Ok(())
    }
}

/// Error for drivers that are not built into this binary
pub(crate) fn driver_not_available(platform: &str) -> DbError {
    DbError::NotImplemented {
        backend: platform.to_string(),
        feature: "database driver".to_string(),
    }
}

#[cfg(test)]
#[path = "traits_test.rs"]
mod tests;
