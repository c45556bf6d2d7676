//! Integration tests for the yuniql binary

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const YUNIQL_ENV: [&str; 9] = [
    "YUNIQL_PLATFORM",
    "YUNIQL_CONNECTION_STRING",
    "YUNIQL_WORKSPACE",
    "YUNIQL_TARGET_VERSION",
    "YUNIQL_META_SCHEMA",
    "YUNIQL_META_TABLE",
    "YUNIQL_COMMAND_TIMEOUT",
    "YUNIQL_TRANSACTION_MODE",
    "YUNIQL_TOKENS",
];

/// Path to the compiled yuniql binary
fn yuniql_bin() -> String {
    env!("CARGO_BIN_EXE_yuniql").to_string()
}

/// Run `yuniql` with a clean YUNIQL_* environment and return
/// (stdout, stderr, exit code).
fn run_yuniql(args: &[&str]) -> (String, String, i32) {
    let mut cmd = Command::new(yuniql_bin());
    for var in YUNIQL_ENV {
        cmd.env_remove(var);
    }
    let output = cmd
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute yuniql with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn init_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    let (_, stderr, code) = run_yuniql(&["init", "-p", &path_str(temp.path())]);
    assert_eq!(code, 0, "init failed: {}", stderr);
    temp
}

#[test]
fn test_init_creates_workspace() {
    let temp = init_workspace();
    for dir in ["_init", "_pre", "_draft", "_post", "_erase", "v0.00"] {
        assert!(temp.path().join(dir).is_dir(), "missing {}", dir);
    }
    assert!(temp.path().join("README.md").is_file());

    let (_, _, code) = run_yuniql(&["init", "-p", &path_str(temp.path())]);
    assert_eq!(code, 0, "init should be idempotent");
}

#[test]
fn test_vnext_creates_next_versions() {
    let temp = init_workspace();
    let ws = path_str(temp.path());

    let (stdout, _, code) = run_yuniql(&["vnext", "-p", &ws]);
    assert_eq!(code, 0);
    assert!(stdout.contains("v0.01"));

    let (_, _, code) = run_yuniql(&["vnext", "-p", &ws, "-M", "-f", "01_tables.sql"]);
    assert_eq!(code, 0);
    assert!(temp.path().join("v1.00/01_tables.sql").is_file());
}

#[test]
fn test_platforms_lists_registry() {
    let (stdout, _, code) = run_yuniql(&["platforms"]);
    assert_eq!(code, 0);
    let names: Vec<&str> = stdout.lines().collect();
    assert!(names.contains(&"duckdb"));
    assert!(names.contains(&"postgresql"));
    assert!(names.contains(&"sqlserver"));
}

#[test]
fn test_run_and_list_against_duckdb_file() {
    let temp = init_workspace();
    let ws = path_str(temp.path());
    let db = path_str(&temp.path().join("app.duckdb"));
    fs::create_dir_all(temp.path().join("v1.00")).unwrap();
    fs::write(
        temp.path().join("v1.00/01_tables.sql"),
        "CREATE TABLE visitor (id INT, name VARCHAR);\nINSERT INTO visitor VALUES (1, '${OWNER}');",
    )
    .unwrap();

    let (stdout, stderr, code) = run_yuniql(&["run", "-p", &ws, "-c", &db, "-a", "-k", "OWNER=ops"]);
    assert_eq!(code, 0, "run failed: {}", stderr);
    assert!(stdout.contains("current version v1.00"));

    let (stdout, _, code) = run_yuniql(&["run", "-p", &ws, "-c", &db]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Database is up to date"));

    let (stdout, stderr, code) = run_yuniql(&["info", "-p", &ws, "-c", &db, "--output", "json"]);
    assert_eq!(code, 0, "list failed: {}", stderr);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let versions: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["version"].as_str().unwrap())
        .collect();
    assert_eq!(versions, vec!["v0.00", "v1.00"]);
    assert_eq!(rows[1]["status"], "Successful");
}

#[test]
fn test_missing_database_without_autocreate_fails() {
    let temp = init_workspace();
    let ws = path_str(temp.path());
    let db = temp.path().join("absent.duckdb");

    let (_, stderr, code) = run_yuniql(&["run", "-p", &ws, "-c", &path_str(&db)]);
    assert_eq!(code, 2);
    assert!(stderr.contains("absent"), "stderr: {}", stderr);
    assert!(!db.exists());
}

#[test]
fn test_missing_connection_string_is_a_configuration_error() {
    let temp = init_workspace();
    let (_, stderr, code) = run_yuniql(&["run", "-p", &path_str(temp.path())]);
    assert_eq!(code, 1);
    assert!(stderr.contains("connection string"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_platform_is_a_configuration_error() {
    let temp = init_workspace();
    let (_, stderr, code) = run_yuniql(&[
        "run",
        "-p",
        &path_str(temp.path()),
        "--platform",
        "db2",
        "-c",
        "x",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("db2"), "stderr: {}", stderr);
}

#[test]
fn test_failing_script_exits_with_two_and_is_listed() {
    let temp = init_workspace();
    let ws = path_str(temp.path());
    let db = path_str(&temp.path().join("app.duckdb"));
    fs::create_dir_all(temp.path().join("v1.00")).unwrap();
    fs::write(
        temp.path().join("v1.00/01_bad.sql"),
        "SELECT * FROM missing_table;",
    )
    .unwrap();

    let (_, stderr, code) = run_yuniql(&["run", "-p", &ws, "-c", &db, "-a"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("v1.00/01_bad.sql"), "stderr: {}", stderr);

    let (stdout, _, code) = run_yuniql(&["list", "-p", &ws, "-c", &db]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Failed"));
    assert!(stdout.contains("failed at v1.00/01_bad.sql"));
}

#[test]
fn test_verify_leaves_database_unchanged() {
    let temp = init_workspace();
    let ws = path_str(temp.path());
    let db = path_str(&temp.path().join("app.duckdb"));
    fs::create_dir_all(temp.path().join("v1.00")).unwrap();
    fs::write(temp.path().join("v1.00/01.sql"), "CREATE TABLE t (id INT);").unwrap();

    let (_, _, code) = run_yuniql(&["run", "-p", &ws, "-c", &db, "-t", "v0.00", "-a"]);
    assert_eq!(code, 0);

    let (stdout, stderr, code) = run_yuniql(&["verify", "-p", &ws, "-c", &db]);
    assert_eq!(code, 0, "verify failed: {}", stderr);
    assert!(stdout.contains("nothing was committed"));

    let (stdout, _, _) = run_yuniql(&["list", "-p", &ws, "-c", &db, "--output", "json"]);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
}
