//! Cache key derivation for analysis requests.
//!
//! Keys depend only on the content of `(patient_id, snapshot)`: object keys are sorted before
//! hashing, so two snapshots built in different field orders share a key. The digest is
//! truncated, which is fine for cache addressing but gives no security guarantee.

use crate::constants::CACHE_KEY_HEX_LEN;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Derive `<namespace>:<16 hex chars>` for an analysis request.
pub fn derive_cache_key(namespace: &str, patient_id: &str, snapshot: &Value) -> String {
    let payload = json!({
        "patientId": patient_id,
        "snapshot": snapshot,
    });
    let digest = hex::encode(Sha256::digest(canonical_json(&payload).as_bytes()));
    format!("{namespace}:{}", &digest[..CACHE_KEY_HEX_LEN])
}

/// Compact JSON with object keys sorted by byte order at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
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
        scalar => out.push_str(&scalar.to_string()),
    }
}
