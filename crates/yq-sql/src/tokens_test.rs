use super::*;

fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_replacement_is_total() {
    let out = replace(&kv(&[("A", "1"), ("B", "2")]), "x=${A},y=${B},z=${C}");
    assert_eq!(out, "x=1,y=2,z=${C}");
}

#[test]
fn test_keys_are_case_sensitive() {
    assert_eq!(replace(&kv(&[("a", "1")]), "${A}${a}"), "${A}1");
}

#[test]
fn test_last_mapping_wins() {
    assert_eq!(replace(&kv(&[("A", "1"), ("A", "2")]), "${A}"), "2");
}

#[test]
fn test_single_pass_does_not_expand_values() {
    let out = replace(&kv(&[("A", "${B}"), ("B", "2")]), "${A}");
    assert_eq!(out, "${B}");
}

#[test]
fn test_malformed_placeholders_are_left_alone() {
    let text = "${} ${UNCLOSED $NAME {B}";
    assert_eq!(replace(&kv(&[("B", "x")]), text), text);
}

#[test]
fn test_empty_token_list_is_identity() {
    assert_eq!(replace(&[], "${A}"), "${A}");
}

#[test]
fn test_unresolved() {
    assert_eq!(unresolved("${B} ${A} ${B}"), vec!["A", "B"]);
    assert!(unresolved("SELECT 1").is_empty());
}

#[test]
fn test_merge_drops_user_collisions_with_reserved() {
    let reserved = kv(&[("YUNIQL_VERSION", "v1.00"), ("YUNIQL_DB_NAME", "app")]);
    let user = kv(&[
        ("YUNIQL_VERSION", "hacked"),
        ("YUNIQL_STATUS", "also reserved"),
        ("ENV", "dev"),
        ("ENV", "prod"),
    ]);
    let merged = merge_tokens(&reserved, &user);

    assert_eq!(
        replace(&merged, "${YUNIQL_VERSION} ${YUNIQL_DB_NAME} ${ENV} ${YUNIQL_STATUS}"),
        "v1.00 app prod ${YUNIQL_STATUS}"
    );
}

#[test]
fn test_reserved_list() {
    assert!(reserved::is_reserved("YUNIQL_TABLE_NAME"));
    assert!(!reserved::is_reserved("yuniql_table_name"));
    assert_eq!(reserved::ALL.len(), 14);
}

#[test]
fn test_pairs_helper() {
    let built = pairs([("A", "1".to_string())]);
    assert_eq!(built, kv(&[("A", "1")]));
}
