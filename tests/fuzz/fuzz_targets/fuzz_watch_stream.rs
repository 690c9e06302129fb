#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Watch stream decoding must not panic on any input.
    for _ in spotwatch::kube::WatchStream::new(data).take(64) {}
});
