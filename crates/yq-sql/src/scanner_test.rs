use super::*;

fn kinds(raw: &str) -> Vec<(SpanKind, &str)> {
    scan(raw).iter().map(|s| (s.kind, s.text(raw))).collect()
}

#[test]
fn test_line_and_block_comments() {
    let raw = "SELECT 1; -- trailing\n/* block\n GO */ SELECT 2;";
    assert_eq!(
        kinds(raw),
        vec![
            (SpanKind::LineComment, "-- trailing"),
            (SpanKind::BlockComment, "/* block\n GO */"),
        ]
    );
}

#[test]
fn test_string_literal_with_escaped_quote() {
    let raw = "SELECT 'it''s; fine' AS x";
    assert_eq!(kinds(raw), vec![(SpanKind::StringLiteral, "'it''s; fine'")]);
}

#[test]
fn test_comment_markers_inside_literals_are_not_comments() {
    let raw = "SELECT '--not a comment', '/* nor this */'";
    let spans = scan(raw);
    assert_eq!(spans.len(), 2);
    assert!(spans.iter().all(|s| s.kind == SpanKind::StringLiteral));
}

#[test]
fn test_quote_inside_comment_is_ignored() {
    let raw = "-- don't\nSELECT 'x'";
    assert_eq!(
        kinds(raw),
        vec![
            (SpanKind::LineComment, "-- don't"),
            (SpanKind::StringLiteral, "'x'"),
        ]
    );
}

#[test]
fn test_block_comments_do_not_nest() {
    let raw = "/* a /* b */ c */";
    assert_eq!(kinds(raw)[0], (SpanKind::BlockComment, "/* a /* b */"));
}

#[test]
fn test_quoted_identifier_and_dollar_body() {
    let raw = "CREATE FUNCTION \"f;n\"() AS $body$ SELECT 1; $body$ LANGUAGE sql;";
    assert_eq!(
        kinds(raw),
        vec![
            (SpanKind::QuotedIdentifier, "\"f;n\""),
            (SpanKind::DollarQuoted, "$body$ SELECT 1; $body$"),
        ]
    );
    assert_eq!(kinds("SELECT $$a;b$$")[0], (SpanKind::DollarQuoted, "$$a;b$$"));
}

#[test]
fn test_placeholders_and_parameters_are_not_dollar_quotes() {
    assert!(scan("SELECT ${YUNIQL_VERSION}, $1, $2").is_empty());
}

#[test]
fn test_dollar_inside_identifier_is_not_a_tag() {
    assert!(scan("SELECT sys$x$y, a$b$c FROM v$session").is_empty());
    assert_eq!(
        kinds("SELECT col, $q$x$q$")[0],
        (SpanKind::DollarQuoted, "$q$x$q$")
    );
}

#[test]
fn test_unterminated_constructs_run_to_end() {
    for (raw, kind) in [
        ("SELECT 'open", SpanKind::StringLiteral),
        ("SELECT 1 /* open", SpanKind::BlockComment),
        ("SELECT 1 -- tail", SpanKind::LineComment),
        ("SELECT $x$ open", SpanKind::DollarQuoted),
    ] {
        let spans = scan(raw);
        assert_eq!(spans.len(), 1, "{}", raw);
        assert_eq!(spans[0].kind, kind);
        assert_eq!(spans[0].end, raw.len());
    }
}

#[test]
fn test_spans_are_ordered_and_disjoint() {
    let raw = "'a' -- b\n/* c */ \"d\" 'e''f' -- g";
    let spans = scan(raw);
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    assert_eq!(spans.len(), 6);
}

#[test]
fn test_contains_uses_span_bounds() {
    let raw = "SELECT 'x;' ;";
    let spans = scan(raw);
    let inside = raw.find(';').unwrap();
    let outside = raw.rfind(';').unwrap();
    assert!(contains(&spans, inside));
    assert!(!contains(&spans, outside));
    assert!(!contains(&spans, 0));
    assert!(!contains(&[], 3));
}

#[test]
fn test_has_executable_content() {
    assert!(!has_executable_content(""));
    assert!(!has_executable_content("  \n\t"));
    assert!(!has_executable_content("-- only\n/* comments */\n"));
    assert!(has_executable_content("-- c\nSELECT 1"));
    assert!(has_executable_content("/* c */'literal'"));
}

#[test]
fn test_multibyte_text_is_handled() {
    let raw = "SELECT 'héllo' -- ünïcode\nSELECT 2";
    let spans = scan(raw);
    assert_eq!(spans[0].text(raw), "'héllo'");
    assert_eq!(spans[1].text(raw), "-- ünïcode");
}
