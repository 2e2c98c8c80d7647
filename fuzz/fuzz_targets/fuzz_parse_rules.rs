#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(rules) = ruleval::parse_rules(input) {
            let _ = ruleval::serialize_rules(&rules);
        }
    }
});
