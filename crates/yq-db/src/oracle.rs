//! Oracle platform
//!
//! Oracle has no separate schema concept for the metadata table (a schema is
//! a user), scripts are batched on a lone `/` like SQL*Plus, and DDL commits
//! implicitly. No OCI driver is linked.

use crate::connection_string::{lookup, parse_pairs};
use crate::error::{DbError, DbResult};
use crate::traits::{
    driver_not_available, DbConnection, PlatformDataService, PlatformFlags, PlatformOptions,
    SqlTemplates,
};
use async_trait::async_trait;
use yq_sql::SeparatorRule;

static TEMPLATES: SqlTemplates = SqlTemplates {
    check_database_exists: "SELECT 1 FROM SYS.DUAL",
    create_database: "SELECT 1 FROM SYS.DUAL",
    check_schema_exists: "SELECT 1 FROM ALL_USERS WHERE USERNAME = '${YUNIQL_SCHEMA_NAME}'",
    create_schema: "SELECT 1 FROM SYS.DUAL",
    check_table_exists: "SELECT 1 FROM USER_TABLES WHERE TABLE_NAME = '${YUNIQL_TABLE_NAME}'",
    create_table: "CREATE TABLE \"${YUNIQL_TABLE_NAME}\" (
    \"sequence_id\" NUMBER GENERATED ALWAYS AS IDENTITY,
    \"version\" VARCHAR2(190) NOT NULL,
    \"applied_on_utc\" TIMESTAMP NOT NULL,
    \"applied_by_user\" VARCHAR2(128) NOT NULL,
    \"applied_by_tool\" VARCHAR2(32) NOT NULL,
    \"applied_by_tool_version\" VARCHAR2(16) NOT NULL,
    \"status\" VARCHAR2(32) NOT NULL,
    \"duration_ms\" NUMBER NOT NULL,
    \"checksum\" VARCHAR2(64) NOT NULL,
    \"failed_script_path\" VARCHAR2(4000) NULL,
    \"failed_script_error\" VARCHAR2(4000) NULL,
    \"additional_artifacts\" VARCHAR2(4000) NULL,
    CONSTRAINT \"pk_${YUNIQL_TABLE_NAME}\" PRIMARY KEY (\"sequence_id\"),
    CONSTRAINT \"ix_${YUNIQL_TABLE_NAME}\" UNIQUE (\"version\")
)",
    get_current_version: "SELECT \"version\" FROM \"${YUNIQL_TABLE_NAME}\" WHERE \"status\" = 'Successful'",
    get_all_versions: "SELECT \"sequence_id\", \"version\", TO_CHAR(\"applied_on_utc\", 'YYYY-MM-DD HH24:MI:SS.FF3'), \"applied_by_user\", \"applied_by_tool\", \"applied_by_tool_version\", \"status\", \"duration_ms\", \"checksum\", \"failed_script_path\", \"failed_script_error\", \"additional_artifacts\" FROM \"${YUNIQL_TABLE_NAME}\" ORDER BY \"sequence_id\" ASC",
    insert_version: "INSERT INTO \"${YUNIQL_TABLE_NAME}\" (\"version\", \"applied_on_utc\", \"applied_by_user\", \"applied_by_tool\", \"applied_by_tool_version\", \"status\", \"duration_ms\", \"checksum\", \"failed_script_path\", \"failed_script_error\", \"additional_artifacts\") VALUES ('${YUNIQL_VERSION}', TO_TIMESTAMP('${YUNIQL_APPLIED_ON_UTC}', 'YYYY-MM-DD HH24:MI:SS.FF3'), '${YUNIQL_APPLIED_BY_USER}', '${YUNIQL_APPLIED_BY_TOOL}', '${YUNIQL_APPLIED_BY_TOOL_VERSION}', '${YUNIQL_STATUS}', ${YUNIQL_DURATION_MS}, '${YUNIQL_CHECKSUM}', '${YUNIQL_FAILED_SCRIPT_PATH}', '${YUNIQL_FAILED_SCRIPT_ERROR}', '${YUNIQL_ADDITIONAL_ARTIFACTS}')",
    update_version: "UPDATE \"${YUNIQL_TABLE_NAME}\" SET \"applied_on_utc\" = TO_TIMESTAMP('${YUNIQL_APPLIED_ON_UTC}', 'YYYY-MM-DD HH24:MI:SS.FF3'), \"applied_by_user\" = '${YUNIQL_APPLIED_BY_USER}', \"applied_by_tool\" = '${YUNIQL_APPLIED_BY_TOOL}', \"applied_by_tool_version\" = '${YUNIQL_APPLIED_BY_TOOL_VERSION}', \"status\" = '${YUNIQL_STATUS}', \"duration_ms\" = ${YUNIQL_DURATION_MS}, \"checksum\" = '${YUNIQL_CHECKSUM}', \"failed_script_path\" = '${YUNIQL_FAILED_SCRIPT_PATH}', \"failed_script_error\" = '${YUNIQL_FAILED_SCRIPT_ERROR}', \"additional_artifacts\" = '${YUNIQL_ADDITIONAL_ARTIFACTS}' WHERE \"version\" = '${YUNIQL_VERSION}'",
    clear_versions: "DELETE FROM \"${YUNIQL_TABLE_NAME}\"",
};

/// Oracle platform
pub struct OraclePlatform {
    options: PlatformOptions,
}

impl OraclePlatform {
    pub fn new(options: PlatformOptions) -> DbResult<Self> {
        let platform = Self { options };
        platform.database_name()?;
        Ok(platform)
    }
}

#[async_trait]
impl PlatformDataService for OraclePlatform {
    fn name(&self) -> &'static str {
        "oracle"
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
        Some(SeparatorRule::slash())
    }

    /// Service name, or the user when the string names none
    fn database_name(&self) -> DbResult<String> {
        let pairs = parse_pairs(&self.options.connection_string);
        if let Some(service) = lookup(&pairs, &["service name", "data source"]) {
            let service = service.rsplit('/').next().unwrap_or(service);
            return Ok(service.to_string());
        }
        lookup(&pairs, &["user id"])
            .map(str::to_string)
            .ok_or_else(|| DbError::InvalidConnectionString {
                platform: self.name().to_string(),
                message: "missing Data Source or User Id".to_string(),
            })
    }

    async fn connect(&self) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available(self.name()))
    }

    async fn connect_master(&self) -> DbResult<Box<dyn DbConnection>> {
        Err(driver_not_available(self.name()))
    }
}
