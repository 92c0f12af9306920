//! Parser integration tests: precedence, round trips and malformed input.

use sieve_filter::{
    ComparisonOperator, Expression, LogicalOperator, ParseOptions, parse_filter,
    parse_filter_with,
};

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_and_binds_tighter_than_or() {
    let ast = parse_filter("a=1 and b=2 or c=3").unwrap();
    let Expression::Logical(or) = &ast else {
        panic!("Expected Logical, got {:?}", ast);
    };
    assert_eq!(or.op, LogicalOperator::Or);
    assert_eq!(or.items.len(), 2);
    let Expression::Logical(and) = &or.items[0] else {
        panic!("Expected nested Logical");
    };
    assert_eq!(and.op, LogicalOperator::And);
    assert_eq!(and.items.len(), 2);
    assert_eq!(ast.to_string(), "a = 1 and b = 2 or c = 3");
}

#[test]
fn test_not_binds_tighter_than_and() {
    let ast = parse_filter("not a=1 and b=2").unwrap();
    let Expression::Logical(and) = &ast else {
        panic!("Expected Logical");
    };
    assert!(matches!(and.items[0], Expression::Not(_)));
}

#[test]
fn test_arithmetic_binds_tighter_than_comparison() {
    let ast = parse_filter("price * qty - discount >= 100").unwrap();
    let Expression::Comparison(cmp) = &ast else {
        panic!("Expected Comparison");
    };
    assert_eq!(cmp.op, ComparisonOperator::Ge);
    assert!(matches!(cmp.left.as_ref(), Expression::Arithmetic(_)));
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_round_trip_corpus() {
    let corpus = [
        "status = 'active'",
        "a=1 and b=2 or c=3",
        "not (a = 1 or b = 2) and c != null",
        "name ilike '%smith%' and name !ilike 'x_'",
        "age in [1, 2, 3] or age !in []",
        "created >= 2024-01-01 and created < 2024-02-01T00:00:00.250+05:30",
        "opens <= 08:15:30.5",
        "score > -Infinity and score < Infinity",
        "(a + b) * -c / 2.5e-3 = -1",
        "owner = @user.id and team in [@team, 'default']",
        "meta.not.like = true",
        "text = 'line\\nbreak \\'quoted\\' back\\\\slash'",
    ];
    for input in corpus {
        let first = parse_filter(input).unwrap();
        let rendered = first.to_string();
        let second = parse_filter(&rendered).unwrap();
        assert_eq!(first, second, "{} rendered as {}", input, rendered);
        assert_eq!(second.to_string(), rendered);
    }
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_error_points_at_token_after_operator() {
    let err = parse_filter("a= and b").unwrap_err();
    assert_eq!(err.position, 3);
    assert!(err.to_string().starts_with("syntax error at position 3"));
}

#[test]
fn test_error_positions() {
    let cases = [
        ("a = 'open", 4),
        ("a = 1 ~ 2", 6),
        ("a = 1 and", 9),
        ("a = 1 b = 2", 6),
        ("a = [1, (2)]", 8),
        ("count(x) > 1", 5),
        ("a < 1 < 2", 6),
        ("a = 2024-02-30", 4),
    ];
    for (input, position) in cases {
        let err = parse_filter(input).unwrap_err();
        assert_eq!(err.position, position, "{}: {}", input, err);
    }
}

#[test]
fn test_limits() {
    let options = ParseOptions::default().with_max_depth(3);
    assert!(parse_filter_with("((a = 1))", &options).is_ok());
    assert!(parse_filter_with("not not not not a = 1", &options).is_err());

    let options: ParseOptions = serde_json::from_str(r#"{"max_tokens": 4}"#).unwrap();
    assert_eq!(options.max_depth, 64);
    assert!(parse_filter_with("a = 1 or b = 2", &options).is_err());
}
