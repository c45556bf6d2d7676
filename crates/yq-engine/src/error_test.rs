use super::*;

#[test]
fn test_kinds() {
    let cases: Vec<(EngineError, ErrorKind)> = vec![
        (
            CoreError::ConfigInvalid {
                message: "x".to_string(),
            }
            .into(),
            ErrorKind::Configuration,
        ),
        (
            CoreError::DuplicateVersion {
                version: "v1.00".to_string(),
                first: "v1.00".to_string(),
                second: "v1.0".to_string(),
            }
            .into(),
            ErrorKind::VersionResolution,
        ),
        (
            DbError::ConnectionError("refused".to_string()).into(),
            ErrorKind::Connectivity,
        ),
        (
            DbError::UnsupportedPlatform {
                name: "db2".to_string(),
                available: "duckdb".to_string(),
            }
            .into(),
            ErrorKind::Configuration,
        ),
        (
            DbError::CapabilityNotSupported {
                platform: "mysql".to_string(),
                capability: "schemas".to_string(),
            }
            .into(),
            ErrorKind::Capability,
        ),
        (
            EngineError::DatabaseNotFound {
                database: "app".to_string(),
            },
            ErrorKind::Connectivity,
        ),
        (EngineError::NothingToRebase, ErrorKind::VersionResolution),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[test]
fn test_script_failure_display() {
    let err = EngineError::ScriptFailed(Box::new(ScriptFailure {
        version: Some(Version::new(1, 2)),
        script: "v1.02/01_tables.sql".to_string(),
        statement: Some("CREATE TABLE".to_string()),
        batch_no: Some(3),
        error: DbError::sql(None, "syntax error", "CREATE TABLE"),
    }));
    assert_eq!(err.kind(), ErrorKind::ScriptExecution);
    assert_eq!(
        err.to_string(),
        "[M002] Script failed 'v1.02/01_tables.sql' in v1.02 (batch 3): [D002] SQL execution failed: syntax error"
    );
    assert_eq!(err.script_failure().and_then(|f| f.batch_no), Some(3));
}
