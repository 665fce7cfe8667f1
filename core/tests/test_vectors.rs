//! Verify `parse` and `join` against JSON test vectors stored in `test-vectors/`.
//!
//! Parsed URLs are compared as JSON values, so the order of query names in
//! the vector files does not matter; the order of repeated values does.

use abortable_fetch::{join, parse, Query, QueryValue};
use serde_json::Value;

/// Build a `Query` from a vector's `{"name": "v" | ["v", ...]}` object.
fn query_from_json(value: &Value) -> Query {
    let mut query = Query::new();
    for (name, values) in value.as_object().unwrap() {
        let value = match values {
            Value::String(s) => QueryValue::Single(s.clone()),
            Value::Array(items) => QueryValue::Multi(items.iter().map(|v| v.as_str().unwrap().to_string()).collect()),
            other => panic!("unsupported query value: {other}"),
        };
        query.insert(name.clone(), value);
    }
    query
}

#[test]
fn parse_test_vectors() {
    let raw = include_str!("../../test-vectors/parse.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let parsed = parse(case["input"].as_str().unwrap());
        let actual = serde_json::to_value(&parsed).unwrap();
        assert_eq!(actual, case["expected"], "{name}: parsed parts");
    }
}

#[test]
fn join_test_vectors() {
    let raw = include_str!("../../test-vectors/join.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let extra = query_from_json(&case["extra"]);
        let joined = join(case["input"].as_str().unwrap(), &extra);
        assert_eq!(joined, case["expected"].as_str().unwrap(), "{name}: joined url");
    }
}

#[test]
fn parse_vectors_reserialize_to_equivalent_query() {
    let raw = include_str!("../../test-vectors/parse.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let parsed = parse(case["input"].as_str().unwrap());
        let reparsed = parse(&parsed.to_string());
        assert_eq!(reparsed.query, parsed.query, "{name}: query survives re-serialization");
        assert_eq!(reparsed.base(), parsed.base(), "{name}: base survives re-serialization");
    }
}

#[test]
fn join_with_empty_extra_is_stable() {
    let raw = include_str!("../../test-vectors/join.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let once = join(case["input"].as_str().unwrap(), &Query::new());
        let twice = join(&once, &Query::new());
        assert_eq!(twice, once, "{name}: join is idempotent without extra params");
    }
}

#[test]
fn rejoining_drops_empty_embedded_values() {
    let once = join("http://x.com/a", &Query::from([("q", "")]));
    assert_eq!(once, "http://x.com/a?q=");
    assert_eq!(join(&once, &Query::new()), "http://x.com/a?");
}
