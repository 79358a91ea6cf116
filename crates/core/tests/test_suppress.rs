//! Tests for inline NOLINT suppression

use lintmux_core::suppress::{filter_inline, is_line_suppressed, parse_nolint, Nolint};
use lintmux_core::{Issue, Severity};
use tempfile::TempDir;

#[test]
fn test_parse_nolint_markers() {
    let content = "int a; // NOLINT\n// NOLINTNEXTLINE\nint b;\nint c; // nolint\n";
    let markers = parse_nolint(content);
    assert_eq!(markers.get(&1), Some(&Nolint::SameLine));
    assert_eq!(markers.get(&2), Some(&Nolint::NextLine));
    assert_eq!(markers.get(&3), None);
    // Markers are case-sensitive.
    assert_eq!(markers.get(&4), None);
}

#[test]
fn test_marker_needs_word_boundary() {
    let markers = parse_nolint("x = NOLINTER\ny = MYNOLINT\n");
    assert!(markers.is_empty());
}

#[test]
fn test_is_line_suppressed() {
    let markers = parse_nolint("a # NOLINT\n# NOLINTNEXTLINE\nb\nc\n");
    assert!(is_line_suppressed(1, &markers));
    assert!(!is_line_suppressed(2, &markers));
    assert!(is_line_suppressed(3, &markers));
    assert!(!is_line_suppressed(4, &markers));
}

#[test]
fn test_next_line_marker_on_last_line() {
    let markers = parse_nolint("a\n# NOLINTNEXTLINE");
    assert!(!is_line_suppressed(2, &markers));
    assert!(is_line_suppressed(3, &markers));
}

#[test]
fn test_filter_inline_unreadable_file() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("gone.py");
    let issue = Issue::new(&missing, 1, "pycodestyle", "E501", Severity::MAX, "m", None);

    let (kept, suppressed) = filter_inline(vec![issue]);
    assert_eq!(kept.len(), 1);
    assert!(suppressed.is_empty());
}

#[test]
fn test_filter_inline_per_file() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a.py");
    let b = tmp.path().join("b.py");
    std::fs::write(&a, "x = 1  # NOLINT\n").unwrap();
    std::fs::write(&b, "x = 1\n").unwrap();

    let issues = vec![
        Issue::new(&a, 1, "pycodestyle", "E225", Severity::MAX, "m", None),
        Issue::new(&b, 1, "pycodestyle", "E225", Severity::MAX, "m", None),
    ];
    let (kept, suppressed) = filter_inline(issues);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].filename, b);
    assert_eq!(suppressed[0].issue.filename, a);
}
