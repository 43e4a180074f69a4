#![no_main]

use hoist::context::Context;
use hoist::tmpl::Template;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut ctx = Context::new("hoist", "1.0.0");
    ctx.env.insert("KEY".to_string(), "value".to_string());
    let template = Template::new(&ctx);

    // Arbitrary input may fail, but must never panic.
    let _ = template.apply(input);

    // Escaped literals must roundtrip unchanged.
    let escaped = input.replace('{', "{{").replace('}', "}}");
    if let Ok(expanded) = template.apply(&escaped) {
        assert_eq!(expanded, input);
    }
});
