#![no_main]

use libfuzzer_sys::fuzz_target;

// Input is `<rules yaml>\0<json value>`; only configuration errors may
// come back as `Err`, never a panic.
fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|b| *b == 0) else {
        return;
    };
    let (rules, value) = data.split_at(split);
    let Ok(rules) = std::str::from_utf8(rules) else {
        return;
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&value[1..]) else {
        return;
    };
    if let Ok(rules) = ruleval::parse_rules(rules) {
        let _ = ruleval::Validator::new().validate(&value, rules);
    }
});
