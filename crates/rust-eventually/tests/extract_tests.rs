//! Integration tests for single-group extraction and pattern matching.

use rust_eventually::{EventuallyError, Extractor, Pattern, StreamBuffer, find_first};

#[test]
fn extracts_from_buffer_lines() {
    let (writer, buffer) = StreamBuffer::channel();
    for line in ["a", "bb", "x_trace:123"] {
        writer.append_line(line);
    }
    let extractor = Extractor::new(r"x_trace:(\d+)").unwrap();
    let text = buffer.text_from(rust_eventually::Cursor::START);
    assert_eq!(extractor.extract(&text).as_deref(), Some("123"));
}

#[test]
fn no_match_and_empty_capture_are_distinct() {
    let extractor = Extractor::new(r"user=(\w*);").unwrap();
    assert_eq!(extractor.extract("nothing here"), None);
    assert_eq!(extractor.extract("user=;"), Some(String::new()));
}

#[test]
fn non_participating_group_is_no_match() {
    let extractor = Extractor::new(r"id(?:=(\d+))?").unwrap();
    assert_eq!(extractor.extract("id"), None);
    assert_eq!(extractor.extract("id=7").as_deref(), Some("7"));
}

#[test]
fn wrong_arity_fails_fast() {
    for pattern in [r"x_trace:\d+", r"(\w+)=(\w+)"] {
        let err = Extractor::new(pattern).unwrap_err();
        assert!(err.is_contract());
        assert!(matches!(err, EventuallyError::PatternContract { .. }));
    }

    let err = Extractor::from_pattern(Pattern::literal("(a)")).unwrap_err();
    assert!(matches!(err, EventuallyError::PatternContract { groups: 0, .. }));
}

#[test]
fn invalid_regex_is_reported() {
    let err = Extractor::new(r"(unclosed").unwrap_err();
    assert!(matches!(err, EventuallyError::Regex(_)));
}

#[test]
fn repeated_identifiers() {
    let log = "trace=1 ok\ntrace=2 ok\ntrace=3 failed\n";
    let extractor = Extractor::new(r"trace=(\d+)").unwrap();
    assert_eq!(extractor.extract(log).as_deref(), Some("1"));
    assert_eq!(extractor.extract_last(log).as_deref(), Some("3"));
    assert_eq!(extractor.extract_all(log), ["1", "2", "3"]);
}

#[test]
fn find_first_reports_groups_and_position() {
    let pattern = Pattern::regex(r"(\w+)@(\w+)").unwrap();
    let m = find_first("mail to: alice@example", &pattern).unwrap();
    assert_eq!(m.text, "alice@example");
    assert_eq!(m.start, 9);
    assert_eq!(m.end, 22);
    assert_eq!(
        m.captures,
        [Some("alice".to_string()), Some("example".to_string())]
    );
}

#[test]
fn literal_patterns_do_not_interpret_regex() {
    let pattern = Pattern::literal("a.b");
    assert!(find_first("axb", &pattern).is_none());
    assert!(find_first("a.b", &pattern).is_some());

    let quoted = Pattern::quoted("price: $5 (net)");
    assert!(quoted.is_match("the price: $5 (net) applies"));
}

#[test]
fn first_match_wins() {
    let pattern = Pattern::regex(r"\d+").unwrap();
    let m = find_first("a 12 b 345", &pattern).unwrap();
    assert_eq!(m.text, "12");
}
