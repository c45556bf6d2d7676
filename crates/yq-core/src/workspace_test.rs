use super::*;
use std::collections::BTreeSet;
use tempfile::TempDir;

fn dir_set(root: &Path) -> BTreeSet<String> {
    fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_init_creates_layout() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path().join("db"));
    store.init().unwrap();

    let entries = dir_set(store.root());
    for name in [
        "_init",
        "_pre",
        "_draft",
        "_post",
        "_erase",
        "v0.00",
        "README.md",
        "Dockerfile",
        ".gitignore",
    ] {
        assert!(entries.contains(name), "missing {}", name);
    }
}

#[test]
fn test_init_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path());
    store.init().unwrap();
    let first = dir_set(temp.path());

    fs::write(temp.path().join("README.md"), "custom").unwrap();
    fs::write(temp.path().join("v0.00/01_base.sql"), "SELECT 1;").unwrap();
    store.init().unwrap();
    store.init().unwrap();

    assert_eq!(dir_set(temp.path()), first);
    assert_eq!(
        fs::read_to_string(temp.path().join("README.md")).unwrap(),
        "custom"
    );
    assert!(temp.path().join("v0.00/01_base.sql").exists());
}

#[test]
fn test_major_then_two_minors_yields_v1_02() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path());
    store.init().unwrap();

    assert_eq!(store.increment_major(None).unwrap(), Version::new(1, 0));
    assert_eq!(store.increment_minor(None).unwrap(), Version::new(1, 1));
    assert_eq!(store.increment_minor(None).unwrap(), Version::new(1, 2));
    assert_eq!(store.get_latest_version().unwrap(), Version::new(1, 2));
    assert!(temp.path().join("v1.02").is_dir());
}

#[test]
fn test_increment_minor_keeps_highest_major() {
    let temp = TempDir::new().unwrap();
    for name in ["v0.00", "v1.05", "v2.00"] {
        fs::create_dir(temp.path().join(name)).unwrap();
    }
    let store = VersionStore::new(temp.path());
    assert_eq!(store.increment_minor(None).unwrap(), Version::new(2, 1));
    assert_eq!(store.increment_major(None).unwrap(), Version::new(3, 0));
}

#[test]
fn test_increment_copies_existing_template() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path().join("ws"));
    store.init().unwrap();
    let template = temp.path().join("template.sql");
    fs::write(&template, "-- template").unwrap();

    let v = store.increment_minor(Some(&template)).unwrap();
    let seeded = store.root().join(v.to_string()).join("template.sql");
    assert_eq!(fs::read_to_string(seeded).unwrap(), "-- template");
}

#[test]
fn test_increment_creates_empty_file_for_missing_template() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path());
    store.init().unwrap();

    let v = store
        .increment_major(Some(Path::new("create_tables.sql")))
        .unwrap();
    let seeded = temp.path().join(v.to_string()).join("create_tables.sql");
    assert_eq!(fs::read_to_string(seeded).unwrap(), "");
}

#[test]
fn test_get_all_versions_sorted_and_skips_buckets() {
    let temp = TempDir::new().unwrap();
    for name in ["v1.10", "v1.02", "v0.00", "_init", "_draft", ".git", "vendor"] {
        fs::create_dir(temp.path().join(name)).unwrap();
    }
    fs::write(temp.path().join("v9.00"), "not a directory").unwrap();

    let store = VersionStore::new(temp.path());
    assert_eq!(
        store.get_all_versions().unwrap(),
        vec![Version::new(0, 0), Version::new(1, 2), Version::new(1, 10)]
    );
}

#[test]
fn test_malformed_name_is_best_effort_for_listing() {
    let temp = TempDir::new().unwrap();
    for name in ["v0.00", "v1.x", "v1.01"] {
        fs::create_dir(temp.path().join(name)).unwrap();
    }
    let store = VersionStore::new(temp.path());

    assert_eq!(
        store.get_all_versions().unwrap(),
        vec![Version::new(0, 0), Version::new(1, 1)]
    );
    let scan = store.scan().unwrap();
    assert_eq!(scan.invalid.len(), 1);

    assert!(matches!(
        store.get_latest_version(),
        Err(CoreError::InvalidVersionFormat { .. })
    ));
    assert!(matches!(
        store.resolve(),
        Err(CoreError::InvalidVersionFormat { .. })
    ));
}

#[test]
fn test_uppercase_v_is_not_a_version_dir() {
    let temp = TempDir::new().unwrap();
    for name in ["v0.00", "V1.00"] {
        fs::create_dir(temp.path().join(name)).unwrap();
    }
    let store = VersionStore::new(temp.path());

    let scan = store.scan().unwrap();
    assert!(scan.invalid.is_empty());
    assert_eq!(store.resolve().unwrap().len(), 1);
    assert_eq!(store.get_latest_version().unwrap(), Version::BASELINE);
}

#[test]
fn test_increment_past_u32_max_creates_nothing() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("v1.4294967295")).unwrap();
    let store = VersionStore::new(temp.path());

    assert!(matches!(
        store.increment_minor(None),
        Err(CoreError::ConfigInvalid { .. })
    ));
    assert_eq!(dir_set(temp.path()), BTreeSet::from(["v1.4294967295".to_string()]));
    assert_eq!(store.increment_major(None).unwrap(), Version::new(2, 0));
}

#[test]
fn test_duplicate_versions_are_rejected() {
    let temp = TempDir::new().unwrap();
    for name in ["v1.2", "v1.02"] {
        fs::create_dir(temp.path().join(name)).unwrap();
    }
    let store = VersionStore::new(temp.path());
    match store.resolve() {
        Err(CoreError::DuplicateVersion { version, .. }) => assert_eq!(version, "v1.02"),
        other => panic!("expected duplicate error, got {:?}", other),
    }
    assert!(store.get_all_versions().is_err());
}

#[test]
fn test_missing_workspace() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path().join("missing"));
    assert!(matches!(
        store.get_latest_version(),
        Err(CoreError::WorkspaceNotFound { .. })
    ));
    assert!(VersionStore::open(temp.path().join("missing")).is_err());
}

#[test]
fn test_empty_workspace_has_no_latest() {
    let temp = TempDir::new().unwrap();
    let store = VersionStore::new(temp.path());
    assert!(matches!(
        store.get_latest_version(),
        Err(CoreError::NoVersions { .. })
    ));
}

#[test]
fn test_consolidate_baseline_archives_and_flattens() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("v0.00")).unwrap();
    fs::write(root.join("v0.00/01_schema.sql"), "CREATE SCHEMA s;").unwrap();
    fs::create_dir_all(root.join("v1.00/tables")).unwrap();
    fs::write(root.join("v1.00/tables/01_t.sql"), "CREATE TABLE t (id INT);").unwrap();
    fs::create_dir_all(root.join("v1.01")).unwrap();

    let store = VersionStore::new(root);
    let applied = store.resolve().unwrap();
    let layout = store.consolidate_baseline(&applied, "20260101000000").unwrap();

    assert_eq!(
        layout.baseline_files,
        vec!["001_v0.00_01_schema.sql", "002_v1.00_tables_01_t.sql"]
    );
    assert!(layout.archive_dir.join("v1.00/tables/01_t.sql").exists());
    assert!(layout.archive_dir.join("v1.01").is_dir());
    assert!(!root.join("v1.00").exists());
    assert_eq!(store.get_all_versions().unwrap(), vec![Version::BASELINE]);
    assert_eq!(
        fs::read_to_string(root.join("v0.00/002_v1.00_tables_01_t.sql")).unwrap(),
        "CREATE TABLE t (id INT);"
    );
}

#[cfg(unix)]
#[test]
fn test_failed_consolidation_restores_version_dirs() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("v0.00")).unwrap();
    fs::write(root.join("v0.00/01_schema.sql"), "CREATE SCHEMA s;").unwrap();
    fs::create_dir_all(root.join("v1.00")).unwrap();
    fs::write(root.join("v1.00/01_t.sql"), "CREATE TABLE t (id INT);").unwrap();
    std::os::unix::fs::symlink(root.join("missing.sql"), root.join("v1.00/02_link.sql")).unwrap();

    let store = VersionStore::new(root);
    let applied = store.resolve().unwrap();
    let err = store.consolidate_baseline(&applied, "stamp").unwrap_err();
    assert!(matches!(err, CoreError::IoWithPath { .. }));

    assert_eq!(
        store.get_all_versions().unwrap(),
        vec![Version::BASELINE, Version::new(1, 0)]
    );
    assert_eq!(dir_set(&root.join("v0.00")), BTreeSet::from(["01_schema.sql".to_string()]));
    assert!(root.join("v1.00/01_t.sql").is_file());
    assert!(!root.join("_archive/stamp").exists());
}

#[test]
fn test_restore_archive_undoes_consolidation() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("v0.00")).unwrap();
    fs::write(root.join("v0.00/01_schema.sql"), "CREATE SCHEMA s;").unwrap();
    fs::create_dir_all(root.join("v1.00")).unwrap();
    fs::write(root.join("v1.00/01_t.sql"), "CREATE TABLE t (id INT);").unwrap();

    let store = VersionStore::new(root);
    let applied = store.resolve().unwrap();
    let layout = store.consolidate_baseline(&applied, "stamp").unwrap();
    store.restore_archive(&layout).unwrap();

    assert_eq!(
        store.get_all_versions().unwrap(),
        vec![Version::BASELINE, Version::new(1, 0)]
    );
    assert_eq!(
        fs::read_to_string(root.join("v0.00/01_schema.sql")).unwrap(),
        "CREATE SCHEMA s;"
    );
    assert!(!root.join("v0.00/001_v0.00_01_schema.sql").exists());
    assert!(!layout.archive_dir.exists());
}

#[test]
fn test_archive_refuses_existing_stamp() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("_archive/stamp")).unwrap();
    let store = VersionStore::new(temp.path());
    assert!(store.archive_versions(&[], "stamp").is_err());
}
