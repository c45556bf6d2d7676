use super::*;

fn texts(raw: &str, rule: &SeparatorRule) -> Vec<String> {
    split(raw, rule).into_iter().map(|b| b.text).collect()
}

#[test]
fn test_empty_script_yields_no_batches() {
    assert!(split("", &SeparatorRule::go()).is_empty());
    assert!(split("", &SeparatorRule::semicolon()).is_empty());
}

#[test]
fn test_no_terminator_yields_whole_script() {
    let raw = "CREATE TABLE t (id INT)\nINSERT INTO t VALUES (1)";
    let batches = split(raw, &SeparatorRule::go());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].text, raw);
    assert_eq!(batches[0].batch_no, 1);
    assert_eq!(batches[0].start_offset, 0);
    assert_eq!(batches[0].end_offset, raw.len());
}

#[test]
fn test_go_in_comment_then_real_go() {
    let batches = texts("-- contains GO\nSELECT 1;\nGO\n", &SeparatorRule::go());
    assert_eq!(batches, vec!["-- contains GO\nSELECT 1;", ""]);
}

#[test]
fn test_go_is_case_insensitive_and_whitespace_tolerant() {
    let raw = "SELECT 1\n  go  \r\nSELECT 2\nGo";
    assert_eq!(texts(raw, &SeparatorRule::go()), vec!["SELECT 1", "SELECT 2"]);
}

#[test]
fn test_go_as_substring_does_not_split() {
    let raw = "SELECT 'GO' AS go_col\nFROM GOODS";
    assert_eq!(split(raw, &SeparatorRule::go()).len(), 1);
}

#[test]
fn test_go_inside_block_comment_or_literal_does_not_split() {
    let raw = "/*\nGO\n*/\nSELECT 'a\nGO\nb'\nGO\nSELECT 2";
    assert_eq!(
        texts(raw, &SeparatorRule::go()),
        vec!["/*\nGO\n*/\nSELECT 'a\nGO\nb'", "SELECT 2"]
    );
}

#[test]
fn test_semicolon_rule_keeps_terminator() {
    let raw = "CREATE TABLE a (id INT);\nCREATE TABLE b (\n  id INT\n);";
    assert_eq!(
        texts(raw, &SeparatorRule::semicolon()),
        vec!["CREATE TABLE a (id INT);", "CREATE TABLE b (\n  id INT\n);"]
    );
}

#[test]
fn test_semicolon_inside_literal_or_comment_does_not_split() {
    let raw = "SELECT 'abc;\ndef'\n, 1 -- done;\nFROM t;";
    let batches = split(raw, &SeparatorRule::semicolon());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].text, raw);
}

#[test]
fn test_semicolon_must_end_the_line() {
    let raw = "SELECT 1; SELECT 2\nSELECT 3";
    assert_eq!(split(raw, &SeparatorRule::semicolon()).len(), 1);
}

#[test]
fn test_dollar_quoted_body_is_not_split() {
    let raw = "CREATE FUNCTION f() RETURNS int AS $$\nBEGIN\n  RETURN 1;\nEND;\n$$ LANGUAGE plpgsql;\nSELECT f();";
    let batches = texts(raw, &SeparatorRule::semicolon());
    assert_eq!(batches.len(), 2);
    assert!(batches[0].ends_with("LANGUAGE plpgsql;"));
    assert_eq!(batches[1], "SELECT f();");
}

#[test]
fn test_dollar_in_identifiers_does_not_merge_batches() {
    let go = texts("SELECT sys$x$y\nGO\nSELECT 2\nGO", &SeparatorRule::go());
    assert_eq!(go, vec!["SELECT sys$x$y", "SELECT 2"]);

    let semi = texts(
        "SELECT a$b$c FROM t;\nSELECT 2;\nSELECT 3;",
        &SeparatorRule::semicolon(),
    );
    assert_eq!(semi, vec!["SELECT a$b$c FROM t;", "SELECT 2;", "SELECT 3;"]);
}

#[test]
fn test_slash_rule() {
    let raw = "BEGIN\n  NULL;\nEND;\n/\nSELECT 1 FROM dual\n/";
    assert_eq!(
        texts(raw, &SeparatorRule::slash()),
        vec!["BEGIN\n  NULL;\nEND;", "SELECT 1 FROM dual"]
    );
}

#[test]
fn test_offsets_point_into_raw_text() {
    let raw = "SELECT 1\nGO\nSELECT 2   \nGO";
    for batch in split(raw, &SeparatorRule::go()) {
        assert_eq!(&raw[batch.start_offset..batch.end_offset], batch.text);
    }
    let numbers: Vec<u32> = split(raw, &SeparatorRule::go())
        .iter()
        .map(|b| b.batch_no)
        .collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn test_no_content_lost() {
    let raw = "A1\nA2\nGO\n-- B1\nB2 'GO'\nGO\nC1";
    let joined: String = split(raw, &SeparatorRule::go())
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let expected: String = raw
        .lines()
        .filter(|l| !l.trim().eq_ignore_ascii_case("GO"))
        .collect::<Vec<_>>()
        .join("\n");
    assert_eq!(joined, expected);
}

#[test]
fn test_from_delimiter() {
    assert_eq!(
        SeparatorRule::from_delimiter("go").unwrap(),
        SeparatorRule::WholeLine("go".to_string())
    );
    assert_eq!(
        SeparatorRule::from_delimiter(" / ").unwrap(),
        SeparatorRule::slash()
    );
    assert_eq!(
        SeparatorRule::from_delimiter(";").unwrap(),
        SeparatorRule::semicolon()
    );
    assert_eq!(SeparatorRule::from_delimiter("$$").unwrap().token(), "$$");
    assert!(SeparatorRule::from_delimiter("  ").is_err());
}
