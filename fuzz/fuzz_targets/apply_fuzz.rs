#![no_main]
use libfuzzer_sys::fuzz_target;
use oxidiff::compress::decoder::{self, ApplyOptions};

fuzz_target!(|data: &[u8]| {
    // Arbitrary containers must only ever produce errors.
    let _ = decoder::apply(&[], data);

    // Same again with an old sequence taken from the input.
    if data.len() >= 2 {
        let split = data.len() / 2;
        let (old, patch) = data.split_at(split);
        let _ = decoder::apply_with(old, patch, &ApplyOptions::lenient());
    }

    // Force a valid tag so the fuzzer reaches the stream parsers quickly.
    if data.len() >= 24 {
        let mut patch = b"OXDIFF1\x00".to_vec();
        patch.extend_from_slice(data);
        let _ = decoder::apply(&data[..16], &patch);
    }
});
