use super::*;
use tempfile::TempDir;
use yq_db::{DuckDbPlatform, MySqlPlatform};

fn config(temp: &TempDir) -> Config {
    Config {
        workspace: temp.path().to_path_buf(),
        connection_string: Some(":memory:".to_string()),
        ..Config::default()
    }
}

fn mysql_engine(temp: &TempDir, mode: Option<TransactionMode>) -> MigrationEngine {
    let mut cfg = config(temp);
    cfg.platform = "mysql".to_string();
    cfg.transaction_mode = mode;
    let platform = MySqlPlatform::new(PlatformOptions::new("Server=x;Database=app")).unwrap();
    MigrationEngine::new(cfg, Arc::new(platform)).unwrap()
}

#[test]
fn test_platform_options_from_config() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(&temp);
    cfg.meta_schema = Some("ops".to_string());
    cfg.meta_table = "history".to_string();
    cfg.command_timeout_secs = 5;
    cfg.delimiter = Some("GO".to_string());

    let options = platform_options(&cfg).unwrap();
    assert_eq!(options.connection_string, ":memory:");
    assert_eq!(options.meta_schema.as_deref(), Some("ops"));
    assert_eq!(options.meta_table, "history");
    assert_eq!(options.command_timeout_secs, 5);
    assert_eq!(options.separator, Some(SeparatorRule::go()));

    cfg.delimiter = Some("\n".to_string());
    assert!(matches!(platform_options(&cfg), Err(EngineError::Sql(_))));

    cfg.connection_string = None;
    let err = platform_options(&cfg).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Configuration);
}

#[test]
fn test_missing_workspace_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(&temp);
    cfg.workspace = temp.path().join("nope");
    let platform = DuckDbPlatform::new(PlatformOptions::new(":memory:")).unwrap();
    let err = MigrationEngine::new(cfg, Arc::new(platform)).err().unwrap();
    assert_eq!(err.kind(), crate::ErrorKind::Configuration);
}

#[test]
fn test_from_registry_rejects_unknown_platform() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(&temp);
    cfg.platform = "db2".to_string();
    let err = MigrationEngine::from_registry(cfg, &PlatformRegistry::with_defaults())
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Db(DbError::UnsupportedPlatform { .. })));
}

#[test]
fn test_default_transaction_mode_follows_capabilities() {
    let temp = TempDir::new().unwrap();
    let duck = MigrationEngine::from_registry(config(&temp), &PlatformRegistry::with_defaults())
        .unwrap();
    assert_eq!(duck.transaction_mode(false).unwrap(), TransactionMode::Version);
    assert_eq!(duck.transaction_mode(true).unwrap(), TransactionMode::Session);

    let mysql = mysql_engine(&temp, None);
    assert_eq!(mysql.transaction_mode(false).unwrap(), TransactionMode::None);
}

#[test]
fn test_transactions_need_atomic_ddl() {
    let temp = TempDir::new().unwrap();
    let verify = mysql_engine(&temp, None).transaction_mode(true).unwrap_err();
    assert_eq!(verify.kind(), crate::ErrorKind::Capability);

    let session = mysql_engine(&temp, Some(TransactionMode::Session))
        .transaction_mode(false)
        .unwrap_err();
    assert!(matches!(
        session,
        EngineError::Db(DbError::CapabilityNotSupported { .. })
    ));

    let none = mysql_engine(&temp, Some(TransactionMode::None));
    assert_eq!(none.transaction_mode(false).unwrap(), TransactionMode::None);
}

#[tokio::test]
async fn test_verify_is_refused_before_touching_the_database() {
    let temp = TempDir::new().unwrap();
    let mut engine = mysql_engine(&temp, None);
    let err = engine.verify().await.unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Capability);
    assert_eq!(engine.state(), EngineState::Failed);
}

#[test]
fn test_script_tokens_put_reserved_values_first() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(&temp);
    cfg.tokens = vec![
        ("YUNIQL_VERSION".to_string(), "mine".to_string()),
        ("OWNER".to_string(), "ops".to_string()),
    ];
    let platform = DuckDbPlatform::new(PlatformOptions::new(":memory:")).unwrap();
    let engine = MigrationEngine::new(cfg, Arc::new(platform)).unwrap();

    let tokens = engine.script_tokens(Some(Version::new(1, 3))).unwrap();
    let text = yq_sql::replace(&tokens, "${YUNIQL_VERSION} ${OWNER} ${YUNIQL_SCHEMA_NAME}");
    assert_eq!(text, "v1.03 ops main");
}
