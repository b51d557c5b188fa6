//! Recursive merge of configuration fragments.
//!
//! Objects merge key by key. Any other pairing (scalars, arrays, or
//! values of different kinds) is resolved in favour of the source:
//! the last fragment merged wins. A key keeps the position at which it
//! was first inserted, so iteration order follows the first declaration.

use serde_json::{Map, Value};

/// Merge `source` into `target`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => merge_objects(target, source),
        (target, source) => *target = source,
    }
}

/// Merge the keys of `source` into `target`, recursing into shared keys.
pub fn merge_objects(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match target.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}
