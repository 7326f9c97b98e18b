//! Canonical identity strings for structured keys.
//!
//! A key is any JSON value. Its identity is the compact JSON encoding with
//! object members ordered by name, so two keys that differ only in member
//! insertion order share one identity. The identity doubles as the durable
//! storage address, which makes the encoding part of the on-disk format.

use serde::Serialize;
use serde_json::Value;

use crate::result::AppResult;

/// A caller-supplied key. Objects, arrays, strings, numbers, booleans and
/// `null` are all valid.
pub type Key = Value;

/// Encode a key into its canonical identity string.
pub fn canonicalize(key: &Value) -> String {
    let mut out = String::new();
    write_canonical(key, &mut out);
    out
}

/// Convert any serializable key into JSON and canonicalize it.
pub fn identity_of<K: Serialize + ?Sized>(key: &K) -> AppResult<String> {
    let value = serde_json::to_value(key)?;
    Ok(canonicalize(&value))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(name, out);
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
    }
}

/// JSON string literal with standard escaping.
fn write_string(s: &str, out: &mut String) {
    out.push_str(&Value::String(s.to_owned()).to_string());
}
