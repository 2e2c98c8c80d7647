#![no_main]

use libfuzzer_sys::fuzz_target;
use ruleval::primitives::{resolve_property_path, resolve_simple_path, split_property_path};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the split between the path and the JSON document.
    let split = data[0] as usize % data.len();
    let (path_bytes, value_bytes) = data.split_at(split);
    let path = String::from_utf8_lossy(path_bytes);

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(value_bytes) {
        let _ = resolve_simple_path(&path, &value);
        let _ = resolve_property_path(&split_property_path(&path), &value);
    }
});
