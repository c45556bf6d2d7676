//! Amazon Redshift platform
//!
//! Redshift speaks the PostgreSQL wire protocol, so it shares the
//! `tokio-postgres` driver and connection-string handling. Its catalog and DDL
//! differ: no SERIAL, IDENTITY columns instead, and the master database is
//! `dev`.

use crate::error::DbResult;
use crate::postgres::{driver, pg_database_name};
use crate::traits::{DbConnection, PlatformDataService, PlatformFlags, PlatformOptions, SqlTemplates};
use async_trait::async_trait;
use yq_sql::SeparatorRule;

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT COUNT(1) > 0 FROM pg_database WHERE datname = '${YUNIQL_DB_NAME}'",
    create_database: "CREATE DATABASE \"${YUNIQL_DB_NAME}\"",
    check_schema_exists: "SELECT COUNT(1) > 0 FROM pg_namespace WHERE nspname = '${YUNIQL_SCHEMA_NAME}'",
    create_schema: "CREATE SCHEMA IF NOT EXISTS \"${YUNIQL_SCHEMA_NAME}\"",
    check_table_exists: "SELECT COUNT(1) > 0 FROM information_schema.tables WHERE table_schema = '${YUNIQL_SCHEMA_NAME}' AND table_name = '${YUNIQL_TABLE_NAME}'",
    create_table: "CREATE TABLE \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" (
    sequence_id INTEGER IDENTITY(1,1) NOT NULL,
    version VARCHAR(190) NOT NULL,
    applied_on_utc TIMESTAMP NOT NULL,
    applied_by_user VARCHAR(128) NOT NULL,
    applied_by_tool VARCHAR(32) NOT NULL,
    applied_by_tool_version VARCHAR(16) NOT NULL,
    status VARCHAR(32) NOT NULL,
    duration_ms BIGINT NOT NULL,
    checksum VARCHAR(64) NOT NULL,
    failed_script_path VARCHAR(4000) NULL,
    failed_script_error VARCHAR(4000) NULL,
    additional_artifacts VARCHAR(4000) NULL,
    PRIMARY KEY (sequence_id),
    UNIQUE (version)
)",
    get_current_version: "SELECT version FROM \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" WHERE status = 'Successful'",
    get_all_versions: "SELECT sequence_id, version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts FROM \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" ORDER BY sequence_id",
    insert_version: "INSERT INTO \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" (version, applied_on_utc, applied_by_user, applied_by_tool, applied_by_tool_version, status, duration_ms, checksum, failed_script_path, failed_script_error, additional_artifacts) VALUES ('${YUNIQL_VERSION}', '${YUNIQL_APPLIED_ON_UTC}', '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', ''))",
    update_version: "UPDATE \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\" SET applied_on_utc = '${YUNIQL_APPLIED_ON_UTC}', applied_by_user = '${YUNIQL_APPLIED_BY_USER}', applied_by_tool = '${YUNIQL_APPLIED_BY_TOOL}', applied_by_tool_version = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', status = '${YUNIQL_STATUS}', duration_ms = ${YUNIQL_DURATION_MS}, checksum = '${YUNIQL_CHECKSUM}', failed_script_path = NULLIF('${YUNIQL_FAILED_SCRIPT_PATH}', ''), failed_script_error = NULLIF('${YUNIQL_FAILED_SCRIPT_ERROR}', ''), additional_artifacts = NULLIF('${YUNIQL_ADDITIONAL_ARTIFACTS}', '') WHERE version = '${YUNIQL_VERSION}'",
    clear_versions: "DELETE FROM \"${YUNIQL_SCHEMA_NAME}\".\"${YUNIQL_TABLE_NAME}\"",
};

/// Amazon Redshift platform
pub struct RedshiftPlatform {
    options: PlatformOptions,
}

impl RedshiftPlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        let platform = Self { options };
        platform.database_name()?;
        Ok(platform)
    }
}

#[async_trait]
impl PlatformDataService for RedshiftPlatform {
    fn name(&self) -> &'static str {
        "redshift"
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
        driver::connect(&self.options, Some("dev")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_table_and_public_schema() {
        let p = RedshiftPlatform::new(PlatformOptions::new(
            "host=cluster.example.com port=5439 user=admin dbname=warehouse",
        ))
        .unwrap();
        assert_eq!(p.database_name().unwrap(), "warehouse");
        let ddl = p.sql_for_configure_database().unwrap();
        assert!(ddl.starts_with("CREATE TABLE \"public\".\"__yuniqldbversion\""));
        assert!(ddl.contains("IDENTITY(1,1)"));
    }
}
