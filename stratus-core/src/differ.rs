//! Differ - Compare configured attributes with the last known state
//!
//! Update functions gate each mutable field on whether it changed, so two
//! applies of the same configuration send no second request.

use std::collections::HashMap;

use crate::resource::Value;

/// Compare a configured value with the stored one, treating an absent value
/// and a zero value (empty list, map or string, `0`, `false`) alike.
///
/// Maps inside lists are nested blocks: fields present only on the stored
/// side are server-computed and do not count as a difference.
pub fn values_equivalent(desired: Option<&Value>, current: Option<&Value>) -> bool {
    match (desired, current) {
        (Some(Value::Map(a)), Some(Value::Map(b))) => a
            .keys()
            .chain(b.keys())
            .all(|k| values_equivalent(a.get(k), b.get(k))),
        (Some(Value::List(a)), Some(Value::List(b))) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| block_equivalent(a, b))
        }
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        (Some(v), None) | (None, Some(v)) => v.is_zero(),
    }
}

fn block_equivalent(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Map(a), Value::Map(b)) => {
            a.iter().all(|(k, v)| values_equivalent(Some(v), b.get(k)))
        }
        _ => values_equivalent(Some(desired), Some(current)),
    }
}

/// Find configured attributes whose value differs from state
pub fn changed_attributes(
    config: &HashMap<String, Value>,
    state: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed: Vec<String> = config
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .filter(|(key, desired)| !values_equivalent(Some(desired), state.get(key.as_str())))
        .map(|(key, _)| key.clone())
        .collect();
    changed.sort();
    changed
}
