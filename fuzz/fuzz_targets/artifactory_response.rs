#![no_main]

use hoist::pipe::artifactory::DeployResponse;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json_str) = std::str::from_utf8(data) {
        // Deployment documents from hostile servers must parse or fail cleanly.
        let _ = serde_json::from_str::<DeployResponse>(json_str);
    }
});
