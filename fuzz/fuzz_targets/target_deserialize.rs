#![no_main]

use hoist::transfer::UploadTarget;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try to parse as JSON and verify serialization roundtrips
    if let Ok(json_str) = std::str::from_utf8(data) {
        if let Ok(target) = serde_json::from_str::<UploadTarget>(json_str) {
            if let Ok(roundtripped) = serde_json::to_string(&target) {
                if let Ok(parsed) = serde_json::from_str::<UploadTarget>(&roundtripped) {
                    assert_eq!(target, parsed);
                }
            }
        }
    }
});
