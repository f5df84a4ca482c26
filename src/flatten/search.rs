use serde_json::Value;

/// Depth-first search for `key` anywhere inside a JSON tree, returning the
/// first match in pre-order over entries in their given order.
///
/// Object entries whose value is itself an object or array are descended into
/// *before* the key comparison at that level. Two consequences, kept on
/// purpose for robustness against the Play Store's optional-field-heavy
/// nesting: a match deeper in an earlier branch shadows a shallower match in
/// a later one, and a key whose value is composite is never matched directly.
/// Known limitation: a same-named key in an unintended sub-branch can win.
pub fn search_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                match v {
                    Value::Object(_) | Value::Array(_) => {
                        if let Some(found) = search_key(v, key) {
                            return Some(found);
                        }
                    }
                    _ if k == key => return Some(v),
                    _ => {}
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| search_key(item, key)),
        _ => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_a_scalar_at_any_depth() {
        let v = json!({"a": {"b": {"starRating": 4}}});
        assert_eq!(search_key(&v, "starRating"), Some(&json!(4)));
    }

    #[test]
    fn absent_key_is_none() {
        let v = json!({"a": {"b": 1}, "c": [2, 3]});
        assert_eq!(search_key(&v, "missing"), None);
    }

    #[test]
    fn deep_match_in_earlier_branch_wins_over_shallow_later_one() {
        // "device" appears nested under the first entry and flat at top level;
        // composite values are descended into first, so the nested one wins.
        let v = json!({
            "metadata": {"device": "nested-device"},
            "device": "top-device"
        });
        assert_eq!(search_key(&v, "device"), Some(&json!("nested-device")));
        // Deterministic across repeated runs.
        assert_eq!(search_key(&v, "device"), Some(&json!("nested-device")));
    }

    #[test]
    fn composite_valued_key_is_never_matched_directly() {
        let v = json!({"device": {"name": "x"}});
        assert_eq!(search_key(&v, "device"), None);
    }

    #[test]
    fn arrays_are_searched_in_order() {
        let v = json!({"items": [{"a": 1}, {"score": 2}, {"score": 3}]});
        assert_eq!(search_key(&v, "score"), Some(&json!(2)));
    }
}
