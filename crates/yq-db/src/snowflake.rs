//! Snowflake platform
//!
//! Template set and `;` batching for Snowflake. DDL auto-commits, so version
//! transactions are not available. No driver is linked yet.

use crate::connection_string::{lookup, parse_pairs};
use crate::error::{DbError, DbResult};
use crate::traits::{
    driver_not_available, DbConnection, PlatformDataService, PlatformFlags, PlatformOptions,
    SqlTemplates,
};
use async_trait::async_trait;
use yq_sql::SeparatorRule;

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT COUNT(*) > 0 FROM INFORMATION_SCHEMA.DATABASES WHERE DATABASE_NAME = UPPER('${YUNIQL_DB_NAME}');",
    create_database: "CREATE DATABASE \"${YUNIQL_DB_NAME}\";",
    check_schema_exists: "SELECT COUNT(*) > 0 FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = UPPER('${YUNIQL_SCHEMA_NAME}');",
    create_schema: "CREATE SCHEMA IF NOT EXISTS \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\";",
    check_table_exists: "SELECT COUNT(*) > 0 FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = UPPER('${YUNIQL_SCHEMA_NAME}') AND TABLE_NAME = UPPER('${YUNIQL_TABLE_NAME}');",
    create_table: "CREATE TABLE \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" (
    sequence_id NUMBER NOT NULL IDENTITY START 1 INCREMENT 1,
    version VARCHAR(190) NOT NULL,
    applied_on_utc TIMESTAMP_NTZ(9) NOT NULL,
    applied_by_user VARCHAR(128) NOT NULL,
    applied_by_tool VARCHAR(32) NOT NULL,
    applied_by_tool_version VARCHAR(16) NOT NULL,
    status VARCHAR(32) NOT NULL,
    duration_ms NUMBER NOT NULL,
    checksum VARCHAR(64) NOT NULL,
    failed_script_path VARCHAR(4000) NULL,
    failed_script_error VARCHAR(4000) NULL,
    additional_artifacts VARCHAR(4000) NULL,
    PRIMARY KEY (sequence_id),
    CONSTRAINT ix_${YUNIQL_TABLE_NAME} UNIQUE (version)
);",
    get_current_version: "SELECT version FROM \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" WHERE status = 'Successful';",
    get_all_versions: "SELECT sequence_id, version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts FROM \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" ORDER BY sequence_id ASC;",
    insert_version: "INSERT INTO \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" (version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts) VALUES ('${YUNIQL_VERSION}', '${YUNIQL_APPLIED_ON_UTC}', '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', ''));",
    update_version: "UPDATE \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" SET applied_on_utc = '${YUNIQL_APPLIED_ON_UTC}', applied_by_user = '${YUNIQL_APPLIED_BY_USER}', applied_by_tool = '${YUNIQL_APPLIED_BY_TOOL}', applied_by_tool_version = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', status = '${YUNIQL_STATUS}', duration_ms = ${YUNIQL_DURATION_MS}, checksum = '${YUNIQL_CHECKSUM}', failed_script_path = NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), failed_script_error = NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), additional_artifacts = NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', '') WHERE version = '${YUNIQL_VERSION}';",
    clear_versions: "DELETE FROM \"${YUNIQL_DB_NAME}\".\"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\";",
};

/// Snowflake platform
pub struct SnowflakePlatform {
    options: PlatformOptions,
}

impl SnowflakePlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        let platform = Self { options };
        platform.database_name()?;
        Ok(platform)
    }
}

#[async_trait]
impl PlatformDataService for SnowflakePlatform {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn options(&self) -> &PlatformOptions {
        &self.options
    }

    fn flags(&self) -> PlatformFlags {
        PlatformFlags {
            atomic_ddl: false,
            schemas: true,
            batch_sql: true,
            default_schema: Some("PUBLIC"),
        }
    }

    fn templates(&self) -> &'static SqlTemplates {
        &TEMPLATES
    }

    fn default_separator(&self) -> Option<SeparatorRule> {
        Some(SeparatorRule::semicolon())
    }

    fn database_name(&self) -> DbResult<String> {
        let pairs = parse_pairs(&self.options.connection_string);
        lookup(&pairs, &["db", "database"])
            .map(str::to_string)
            .ok_or_else(|| DbError::InvalidConnectionString {
                platform: self.name().to_string(),
                message: "missing db".to_string(),
            })
    }

    async fn connect(&self) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available(self.name()))
    }

    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available(self.name()))
    }
}
