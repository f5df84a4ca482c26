pub mod search;

use anyhow::{bail, Result};
use serde_json::{Map, Value};

/// One flat record: field name → scalar (or Null for explicit absence).
/// serde_json's preserve_order feature keeps insertion order, which later
/// drives CSV column order.
pub type FlatRecord = Map<String, Value>;

/// One extraction rule: take `source` from the section; with `nested` set,
/// descend one level into it. The value lands under `dest`.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRule {
    pub source: &'static str,
    pub nested: Option<&'static str>,
    pub dest: &'static str,
}

impl ExtractRule {
    pub const fn direct(source: &'static str, dest: &'static str) -> Self {
        Self {
            source,
            nested: None,
            dest,
        }
    }

    pub const fn nested(source: &'static str, nested: &'static str, dest: &'static str) -> Self {
        Self {
            source,
            nested: Some(nested),
            dest,
        }
    }
}

/// Resolve each rule against `section` and collect the hits into a FlatRecord.
///
/// A rule whose source key is absent contributes nothing (the field is simply
/// missing). A present source key with `nested: None` is copied verbatim,
/// composite values included. With `nested: Some(k)`, the value must be an
/// object containing `k`; anything else is a schema mismatch and fails the
/// whole record. Keys in `section` with no matching rule are ignored.
pub fn extract_by_map(rules: &[ExtractRule], section: &Map<String, Value>) -> Result<FlatRecord> {
    let mut record = FlatRecord::new();
    for rule in rules {
        let Some(value) = section.get(rule.source) else {
            continue;
        };
        match rule.nested {
            None => {
                record.insert(rule.dest.to_string(), value.clone());
            }
            Some(key) => {
                let Some(inner) = value.as_object() else {
                    bail!(
                        "schema mismatch: '{}' is not an object (expected nested '{}')",
                        rule.source,
                        key
                    );
                };
                let Some(nested_value) = inner.get(key) else {
                    bail!("schema mismatch: '{}' has no nested key '{}'", rule.source, key);
                };
                record.insert(rule.dest.to_string(), nested_value.clone());
            }
        }
    }
    Ok(record)
}

// ── Tests ──
