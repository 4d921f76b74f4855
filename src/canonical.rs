//! Payload Canonicalization
//!
//! Turns a structured payload into one deterministic byte string for
//! hashing. Two payloads that are semantically equal canonicalize
//! identically regardless of key insertion order; any semantic difference
//! changes the output.
//!
//! Encoding rules, fixed for the life of the chain:
//! - compact JSON, UTF-8, no whitespace
//! - object keys sorted bytewise at every nesting level, not just the top
//! - strings escaped by `serde_json` (minimal escaping)
//! - integers rendered as-is, floats as shortest round-trip form
//! - `null` is a value; a present-but-null key hashes differently from an
//!   absent key

use serde_json::Value;

use crate::error::{AuditError, Result};

/// Canonicalize a payload into the byte string that gets hashed.
///
/// Fails with [`AuditError::Encoding`] if the payload contains a value
/// outside the supported set (in practice, a non-finite number).
pub fn canonicalize(payload: &Value) -> Result<Vec<u8>> {
    let mut out = String::new();
    write_value(payload, &mut out)?;
    Ok(out.into_bytes())
}

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            if !n.is_i64() && !n.is_u64() {
                let f = n
                    .as_f64()
                    .ok_or_else(|| AuditError::Encoding(format!("Unsupported number: {}", n)))?;
                if !f.is_finite() {
                    return Err(AuditError::Encoding(format!("Non-finite number: {}", f)));
                }
            }
            out.push_str(&serde_json::to_string(n)?);
        }
        Value::String(s) => {
            out.push_str(&serde_json::to_string(s)?);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| *key);

            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}
