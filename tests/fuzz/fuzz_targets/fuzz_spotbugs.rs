#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parser must not panic on any input, and whatever it accepts must
    // aggregate cleanly.
    if let Ok(collection) = spotwatch::parsers::spotbugs::parse(data) {
        let _ = spotwatch::aggregate::aggregate(&collection);
    }
});
