use crate::determinism::ids::sha256_hex;
use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde_json::Value;

// Canonical form used for audit hashing:
// - keys sorted lexicographically at every depth
// - compact output, no insignificant whitespace
// - integers only; money and rates never enter hashed bytes as floats
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    let normalized = normalize_value(v)?;
    Ok(serde_json::to_string(&normalized)?.into_bytes())
}

pub fn canonical_sha256_hex<T: Serialize>(value: &T) -> CoreResult<String> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

fn normalize_value(v: Value) -> CoreResult<Value> {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, vv) in entries {
                out.insert(k, normalize_value(vv)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => Ok(Value::Array(
            arr.into_iter()
                .map(normalize_value)
                .collect::<CoreResult<Vec<_>>>()?,
        )),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Ok(Value::Number(n))
            } else {
                Err(CoreError::DeterminismViolation(format!(
                    "canonical JSON forbids non-integer number {}",
                    n
                )))
            }
        }
        other => Ok(other),
    }
}
