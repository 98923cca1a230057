// SPDX-License-Identifier: Apache-2.0
//! Config fingerprinting: a stable 64-bit hex digest over the pair
//! `{program, stack}`, deterministic across nil/empty maps and insensitive
//! to map iteration order.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use super::types::ConfigValue;

/// Hash the `{program, stack}` config pair. Canonicalized by routing both
/// sides through `serde_json::Value`, whose default `Map` is key-sorted
/// (the `preserve_order` feature is deliberately not enabled), so insertion
/// order never affects the resulting bytes.
pub fn hash_config(
    program: &HashMap<String, ConfigValue>,
    stack: &HashMap<String, ConfigValue>,
) -> String {
    let canonical = JsonValue::Object(
        [
            ("program", to_canonical_object(program)),
            ("stack", to_canonical_object(stack)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect(),
    );

    // `to_string` on a `Value` backed by a sorted `Map` is a canonical
    // encoding: same logical content always serializes to the same bytes.
    let bytes = canonical.to_string();
    let digest = blake3::hash(bytes.as_bytes());
    let truncated: [u8; 8] = digest.as_bytes()[0..8].try_into().unwrap();
    hex_encode(&truncated)
}

fn to_canonical_object(map: &HashMap<String, ConfigValue>) -> JsonValue {
    JsonValue::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
