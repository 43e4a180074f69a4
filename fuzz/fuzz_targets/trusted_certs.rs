#![no_main]

use hoist::transfer::{split_pem_bundle, trusted_certificates};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(bundle) = std::str::from_utf8(data) else {
        return;
    };

    for block in split_pem_bundle(bundle) {
        assert!(block.starts_with("-----BEGIN "));
        assert!(block.contains("-----END "));
    }

    // Junk bundles parse to zero certificates instead of failing.
    let _ = trusted_certificates(bundle);
});
