//! Deep merge for tiered YAML configuration.
//!
//! Objects merge key by key; everything else is replaced by the higher tier.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively
/// - Arrays, strings, numbers and booleans are replaced entirely
/// - A null overlay keeps the base value (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use pickles2_mcp::config::deep_merge;
///
/// let base = json!({ "php": { "bin": "php", "ini": "/etc/php.ini" } });
/// let overlay = json!({ "php": { "bin": "/usr/local/bin/php" } });
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged["php"]["bin"], "/usr/local/bin/php");
/// assert_eq!(merged["php"]["ini"], "/etc/php.ini");
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (base, Value::Null) => base,
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let slot = merged.entry(key).or_insert(Value::Null);
                *slot = deep_merge(slot.take(), value);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Fold [`deep_merge`] over tiers ordered lowest to highest priority.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
