use super::*;
use crate::duckdb::DuckDbPlatform;
use crate::mysql::MySqlPlatform;
use chrono::{TimeZone, Utc};
use yq_core::record::VersionStatus;
use yq_core::Version;

fn duck(options: PlatformOptions) -> DuckDbPlatform {
    DuckDbPlatform::new(options).unwrap()
}

fn lookup<'a>(tokens: &'a [(String, String)], key: &str) -> &'a str {
    tokens
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap()
}

#[test]
fn test_parse_bool() {
    for truthy in ["1", "t", "TRUE", " yes ", "Y"] {
        assert!(parse_bool(truthy), "{truthy}");
    }
    for falsy in ["0", "f", "false", "", "no", "2"] {
        assert!(!parse_bool(falsy), "{falsy}");
    }
}

#[test]
fn test_record_tokens_escape_literals() {
    let record = AppliedVersionRecord {
        sequence_id: 0,
        version: Version::new(2, 3),
        applied_on_utc: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        applied_by_user: "d'arcy".to_string(),
        applied_by_tool: "yuniql".to_string(),
        applied_by_tool_version: "0.1.0".to_string(),
        status: VersionStatus::Failed,
        duration_ms: 42,
        checksum: "ff".to_string(),
        failed_script_path: Some("v2.03/a.sql".to_string()),
        failed_script_error: Some("near 'x'".to_string()),
        additional_artifacts: None,
    };
    let tokens = record_tokens(&record);
    assert_eq!(lookup(&tokens, reserved::VERSION), "v2.03");
    assert_eq!(lookup(&tokens, reserved::APPLIED_ON_UTC), "2026-01-02 03:04:05.000");
    assert_eq!(lookup(&tokens, reserved::APPLIED_BY_USER), "d''arcy");
    assert_eq!(lookup(&tokens, reserved::STATUS), "Failed");
    assert_eq!(lookup(&tokens, reserved::DURATION_MS), "42");
    assert_eq!(lookup(&tokens, reserved::FAILED_SCRIPT_ERROR), "near ''x''");
    assert_eq!(lookup(&tokens, reserved::ADDITIONAL_ARTIFACTS), "");
}

#[test]
fn test_base_tokens_and_render() {
    let mut options = PlatformOptions::new(":memory:");
    options.meta_schema = Some("ops".to_string());
    options.meta_table = "history".to_string();
    let platform = duck(options);

    let tokens = platform.base_tokens().unwrap();
    assert_eq!(lookup(&tokens, reserved::DB_NAME), "memory");
    assert_eq!(lookup(&tokens, reserved::SCHEMA_NAME), "ops");
    assert_eq!(lookup(&tokens, reserved::TABLE_NAME), "history");

    let extra = tokens::pairs([("X", "1".to_string())]);
    assert_eq!(
        platform
            .render("${YUNIQL_SCHEMA_NAME}.${YUNIQL_TABLE_NAME}=${X}", &extra)
            .unwrap(),
        "ops.history=1"
    );
}

#[test]
fn test_capabilities_reflect_options() {
    let platform = duck(PlatformOptions::new(":memory:"));
    let caps = platform.capabilities();
    assert!(caps.is_schema_supported);
    assert!(!caps.is_batch_sql_supported);
    assert_eq!(caps.meta_schema_name.as_deref(), Some("main"));
}

#[test]
fn test_schema_sql_requires_schema_support() {
    let platform = MySqlPlatform::new(PlatformOptions::new("Database=app")).unwrap();
    for result in [
        platform.sql_for_check_if_schema_exists(),
        platform.sql_for_create_schema(),
    ] {
        match result {
            Err(DbError::CapabilityNotSupported { platform, capability }) => {
                assert_eq!(platform, "mysql");
                assert_eq!(capability, "schemas");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
    // the schema token renders empty rather than failing
    assert_eq!(platform.render("[${YUNIQL_SCHEMA_NAME}]", &[]).unwrap(), "[]");
}

#[test]
fn test_separator_override() {
    let mut options = PlatformOptions::new(":memory:");
    options.separator = Some(SeparatorRule::go());
    let platform = duck(options);
    assert_eq!(
        platform.break_statements("SELECT 1;\nSELECT 2;\nGO\nSELECT 3;"),
        vec!["SELECT 1;\nSELECT 2;", "SELECT 3;"]
    );
}

#[test]
fn test_no_separator_sends_script_whole() {
    let platform = MySqlPlatform::new(PlatformOptions::new("Database=app")).unwrap();
    assert!(platform.break_statements("").is_empty());
    assert_eq!(
        platform.break_statements("SELECT 1;\nSELECT 2;"),
        vec!["SELECT 1;\nSELECT 2;"]
    );
}
