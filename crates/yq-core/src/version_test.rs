use super::*;

#[test]
fn test_parse_and_display() {
    let v = Version::parse("v1.02").unwrap();
    assert_eq!(v, Version::new(1, 2));
    assert_eq!(v.to_string(), "v1.02");
    assert_eq!(Version::parse("v10.115").unwrap().to_string(), "v10.115");
}

#[test]
fn test_parse_accepts_unpadded_minor() {
    assert_eq!(Version::parse("v1.2").unwrap(), Version::parse("v1.02").unwrap());
}

#[test]
fn test_parse_rejects_malformed_names() {
    for name in ["1.00", "v1", "v1.x", "v1.00.01", "_init", "v.01", "v1.00-draft", ""] {
        assert!(
            matches!(
                Version::parse(name),
                Err(CoreError::InvalidVersionFormat { .. })
            ),
            "expected '{}' to be rejected",
            name
        );
    }
}

#[test]
fn test_ordering_is_major_then_minor() {
    let mut versions = vec![
        Version::new(2, 0),
        Version::new(1, 10),
        Version::new(1, 2),
        Version::BASELINE,
        Version::new(10, 0),
    ];
    versions.sort();
    let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
    assert_eq!(rendered, vec!["v0.00", "v1.02", "v1.10", "v2.00", "v10.00"]);
}

#[test]
fn test_looks_like_version() {
    assert!(Version::looks_like_version("v1.00"));
    assert!(Version::looks_like_version("v1.x"));
    assert!(!Version::looks_like_version("_draft"));
    assert!(!Version::looks_like_version("vendor"));
    assert!(!Version::looks_like_version("README.md"));
    assert!(!Version::looks_like_version("V1.00"));
}

#[test]
fn test_increments() {
    let v = Version::new(1, 5);
    assert_eq!(v.next_minor().unwrap(), Version::new(1, 6));
    assert_eq!(v.next_major().unwrap(), Version::new(2, 0));
}

#[test]
fn test_increments_stop_at_u32_max() {
    let err = Version::new(u32::MAX, 3).next_major().unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    let err = Version::new(2, u32::MAX).next_minor().unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { ref message } if message.contains("minor")));
    assert_eq!(
        Version::new(2, u32::MAX).next_major().unwrap(),
        Version::new(3, 0)
    );
}

#[test]
fn test_serde_uses_text_form() {
    let json = serde_json::to_string(&Version::new(3, 7)).unwrap();
    assert_eq!(json, "\"v3.07\"");
    let back: Version = serde_json::from_str("\"v3.07\"").unwrap();
    assert_eq!(back, Version::new(3, 7));
    assert!(serde_json::from_str::<Version>("\"3.07\"").is_err());
}
