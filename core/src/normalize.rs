//! Normalization of raw JSON payloads.
//!
//! Producers of the raw-text contract routinely quote every primitive
//! (`"postamatId":"12"`, `"urgent":"true"`). [`normalize_json`] retypes such
//! string leaves into real JSON numbers and booleans before the payload is
//! sent, and after a raw response is received.
//!
//! # Design
//! The walk is by value: each object is rebuilt into a fresh ordered map and
//! each array into a fresh vector, so no collection is mutated while it is
//! being iterated. Only object property values and array elements are
//! coerced; a scalar root is left as it is.

use std::collections::HashSet;

use serde_json::{Map, Number, Value};
use tracing::debug;

/// Normalize a raw JSON document.
///
/// - String leaves that parse as an `i32`, then as a finite `f64`, then as a
///   case-insensitive `true`/`false` are replaced by the typed value.
/// - Object property names are rewritten to lowerCamelCase and properties
///   whose value is `null` are dropped.
/// - Input that is not valid JSON (or is the bare literal `null`) is returned
///   unchanged.
///
/// Normalizing an already normalized document yields the same text.
pub fn normalize_json(json: &str) -> String {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Null) => json.to_string(),
        Ok(root) => normalize_node(root).to_string(),
        Err(err) => {
            debug!(error = %err, "payload is not valid JSON, leaving it unchanged");
            json.to_string()
        }
    }
}

fn normalize_node(node: Value) -> Value {
    match node {
        Value::Object(map) => Value::Object(normalize_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_child).collect()),
        other => other,
    }
}

/// A renamed key that would clash with another property keeps its original
/// spelling, so no value is overwritten.
fn normalize_object(map: Map<String, Value>) -> Map<String, Value> {
    let source_keys: HashSet<String> = map.keys().cloned().collect();
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        let renamed = to_lower_camel(&key);
        let key = if renamed != key && (source_keys.contains(&renamed) || out.contains_key(&renamed)) {
            debug!(key = %key, renamed = %renamed, "camelCase name already taken, keeping original key");
            key
        } else {
            renamed
        };
        out.insert(key, normalize_child(value));
    }
    out
}

fn normalize_child(child: Value) -> Value {
    match child {
        Value::String(s) => coerce_primitive(&s).unwrap_or(Value::String(s)),
        nested => normalize_node(nested),
    }
}

/// Integer first, then float, then boolean; the first parse that succeeds wins.
fn coerce_primitive(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i32>() {
        return Some(Value::from(i));
    }
    if let Ok(d) = trimmed.parse::<f64>() {
        // NaN and the infinities have no JSON representation.
        if let Some(n) = Number::from_f64(d) {
            return Some(Value::Number(n));
        }
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    None
}

/// Lower-case the leading upper-case run of a property name:
/// `PostamatId` -> `postamatId`, `ID` -> `id`, `URLValue` -> `urlValue`.
pub(crate) fn to_lower_camel(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if !chars.first().is_some_and(|c| c.is_uppercase()) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if i == 1 && !c.is_uppercase() {
            break;
        }
        let next = chars.get(i + 1);
        if i > 0 && next.is_some_and(|n| !n.is_uppercase()) {
            if next == Some(&' ') {
                out.extend(c.to_lowercase());
                i += 1;
            }
            break;
        }
        out.extend(c.to_lowercase());
        i += 1;
    }
    out.extend(&chars[i..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_flat_object() {
        let out = normalize_json(r#"{"a":"1","b":"2.5","c":"true","d":"hello"}"#);
        assert_eq!(out, r#"{"a":1,"b":2.5,"c":true,"d":"hello"}"#);
    }

    #[test]
    fn recurses_into_objects_and_arrays() {
        assert_eq!(normalize_json(r#"{"x":{"y":"3"}}"#), r#"{"x":{"y":3}}"#);
        assert_eq!(normalize_json(r#"["1","2","a"]"#), r#"[1,2,"a"]"#);
        assert_eq!(
            normalize_json(r#"{"cells":[{"n":"4","busy":"FALSE"}]}"#),
            r#"{"cells":[{"n":4,"busy":false}]}"#
        );
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_json(r#"{"a":"1","b":["2.5","x",{"c":"True"}],"big":"3000000000"}"#);
        let twice = normalize_json(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn malformed_input_is_returned_unchanged() {
        let bad = r#"{"a":"1","#;
        assert_eq!(normalize_json(bad), bad);
        assert_eq!(normalize_json("not json"), "not json");
        assert_eq!(normalize_json(""), "");
    }

    #[test]
    fn bare_null_is_returned_unchanged() {
        assert_eq!(normalize_json("null"), "null");
    }

    #[test]
    fn scalar_root_is_not_coerced() {
        assert_eq!(normalize_json(r#""42""#), r#""42""#);
        assert_eq!(normalize_json("7"), "7");
    }

    #[test]
    fn existing_primitives_are_untouched() {
        let out = normalize_json(r#"{"a":1,"b":false,"c":1.5}"#);
        assert_eq!(out, r#"{"a":1,"b":false,"c":1.5}"#);
    }

    #[test]
    fn integer_wins_over_float() {
        let out = normalize_json(r#"{"a":" -12 ","b":"+3"}"#);
        assert_eq!(out, r#"{"a":-12,"b":3}"#);
    }

    #[test]
    fn out_of_range_integer_becomes_float() {
        let out = normalize_json(r#"{"a":"3000000000"}"#);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["a"].as_f64(), Some(3_000_000_000.0));
        assert!(value["a"].is_f64());
    }

    #[test]
    fn non_finite_floats_stay_strings() {
        let out = normalize_json(r#"{"a":"NaN","b":"inf"}"#);
        assert_eq!(out, r#"{"a":"NaN","b":"inf"}"#);
    }

    #[test]
    fn null_properties_are_dropped_but_null_elements_kept() {
        let out = normalize_json(r#"{"a":null,"b":[null,"1"],"c":{"d":null}}"#);
        assert_eq!(out, r#"{"b":[null,1],"c":{}}"#);
    }

    #[test]
    fn property_names_become_lower_camel_case() {
        let out = normalize_json(r#"{"PostamatId":"5","OpenByLocker":{"LockerNumber":"2"}}"#);
        assert_eq!(out, r#"{"postamatId":5,"openByLocker":{"lockerNumber":2}}"#);
    }

    #[test]
    fn clashing_names_keep_both_values() {
        let out = normalize_json(r#"{"Id":"1","id":"2"}"#);
        assert_eq!(out, r#"{"Id":1,"id":2}"#);
        assert_eq!(normalize_json(&out), out);
    }

    #[test]
    fn two_keys_renaming_to_same_name_keep_both_values() {
        let out = normalize_json(r#"{"ID":"1","Id":"2"}"#);
        assert_eq!(out, r#"{"id":1,"Id":2}"#);
        assert_eq!(normalize_json(&out), out);
    }

    #[test]
    fn key_order_is_preserved() {
        let out = normalize_json(r#"{"z":"1","a":"2","m":"3"}"#);
        assert_eq!(out, r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn lower_camel_handles_acronyms() {
        assert_eq!(to_lower_camel("PostamatId"), "postamatId");
        assert_eq!(to_lower_camel("ID"), "id");
        assert_eq!(to_lower_camel("URLValue"), "urlValue");
        assert_eq!(to_lower_camel("PostamatID"), "postamatID");
        assert_eq!(to_lower_camel("cells"), "cells");
        assert_eq!(to_lower_camel(""), "");
        assert_eq!(to_lower_camel("A"), "a");
    }
}
