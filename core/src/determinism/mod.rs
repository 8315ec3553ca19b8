use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compact JSON with sorted keys and integer-only numbers, suitable for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    // serde_json's default map is ordered, so re-serialising a Value sorts keys at every level.
    let v = serde_json::to_value(value)?;
    reject_floats(&v)?;
    Ok(serde_json::to_vec(&v)?)
}

fn reject_floats(v: &Value) -> CoreResult<()> {
    match v {
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => Err(CoreError::DeterminismViolation(
            format!("canonical JSON forbids non-integer number {}", n),
        )),
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
        _ => Ok(()),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// `r_` + the first 32 hex chars of SHA-256 over the canonical form of `inputs`.
pub fn run_id_for<T: Serialize>(inputs: &T) -> CoreResult<String> {
    let digest = sha256_hex(&to_canonical_bytes(inputs)?);
    Ok(format!("r_{}", &digest[..32]))
}

pub fn now_rfc3339_utc() -> CoreResult<String> {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|e| CoreError::InvalidInput(format!("cannot format timestamp: {}", e)))
}
