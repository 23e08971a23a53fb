#![no_main]
use libfuzzer_sys::fuzz_target;
use oxidiff::compress::Compression;
use oxidiff::compress::decoder;
use oxidiff::compress::encoder::{self, DiffOptions};
use oxidiff::search::config_for_level;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let level = (data[0] % 10) as u32;
    let split = 2 + (data[1] as usize % (data.len() - 2));
    let old = &data[2..split];
    let new = &data[split..];

    let patch = encoder::diff(
        old,
        new,
        DiffOptions {
            search: config_for_level(level),
            compression: Compression::None,
        },
    )
    .unwrap();

    let rebuilt = decoder::apply(old, &patch).unwrap();
    assert_eq!(rebuilt, new);
});
