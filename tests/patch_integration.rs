// Integration tests for patch creation and application.
//
// Covers the full pipeline: suffix index -> search -> container -> applier,
// for every codec, the degenerate inputs, and the corruption paths.

use oxidiff::compress::decoder::{self, ApplyOptions, DecodedPatch};
use oxidiff::compress::encoder::{self, DiffOptions, PatchEncoder};
use oxidiff::compress::Compression;
use oxidiff::format::{HEADER_LEN, Header, Instruction, PatchError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn codecs() -> Vec<Compression> {
    vec![
        Compression::None,
        #[cfg(feature = "zlib")]
        Compression::Zlib { level: 6 },
        #[cfg(feature = "lzma")]
        Compression::Lzma,
    ]
}

fn opts(compression: Compression) -> DiffOptions {
    DiffOptions {
        compression,
        ..Default::default()
    }
}

fn roundtrip(old: &[u8], new: &[u8], compression: Compression) -> Vec<u8> {
    let patch = encoder::diff(old, new, opts(compression)).unwrap();
    let rebuilt = decoder::apply(old, &patch).unwrap();
    assert_eq!(
        rebuilt,
        new,
        "roundtrip mismatch (old={}, new={}, patch={})",
        old.len(),
        new.len(),
        patch.len()
    );
    patch
}

fn generate_data(size: usize, seed: u64) -> Vec<u8> {
    let mut data = vec![0u8; size];
    StdRng::seed_from_u64(seed).fill(&mut data[..]);
    data
}

fn mutate_data(old: &[u8], changes: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut new = old.to_vec();
    for _ in 0..changes {
        let pos = rng.random_range(0..new.len());
        new[pos] = rng.random();
    }
    new
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn roundtrip_every_codec() {
    let old = generate_data(64 * 1024, 1);
    let new = mutate_data(&old, 300, 2);
    for c in codecs() {
        roundtrip(&old, &new, c);
    }
}

#[test]
fn roundtrip_every_level() {
    let old = generate_data(16 * 1024, 3);
    let mut new = mutate_data(&old, 50, 4);
    new.splice(4000..4000, b"spliced in".iter().copied());
    new.truncate(15_000);
    for level in 0..=9 {
        let patch = encoder::diff(&old, &new, DiffOptions::with_level(level)).unwrap();
        assert_eq!(decoder::apply(&old, &patch).unwrap(), new, "level {level}");
    }
}

#[test]
fn roundtrip_unrelated_inputs() {
    let old = generate_data(10_000, 5);
    let new = generate_data(12_000, 6);
    for c in codecs() {
        roundtrip(&old, &new, c);
    }
}

#[cfg(feature = "zlib")]
#[test]
fn roundtrip_reordered_blocks() {
    let a = generate_data(5000, 7);
    let b = generate_data(5000, 8);
    let c = generate_data(5000, 9);
    let old = [a.clone(), b.clone(), c.clone()].concat();
    let new = [c, a.clone(), b, a].concat();
    let patch = roundtrip(&old, &new, Compression::Zlib { level: 9 });
    assert!(patch.len() < new.len() / 4, "patch is {} bytes", patch.len());
}

#[cfg(feature = "zlib")]
#[test]
fn small_edits_give_small_patch() {
    let old = generate_data(256 * 1024, 10);
    let new = mutate_data(&old, 100, 11);
    let patch = roundtrip(&old, &new, Compression::default());
    assert!(
        patch.len() < new.len() / 20,
        "patch {} bytes for {} byte input",
        patch.len(),
        new.len()
    );
}

#[test]
fn encoder_serves_many_targets() {
    let old = generate_data(32 * 1024, 12);
    let encoder = PatchEncoder::new(&old, DiffOptions::default()).unwrap();
    for seed in 0..5 {
        let new = mutate_data(&old, 10 + seed as usize * 20, 100 + seed);
        let patch = encoder.encode(&new).unwrap();
        assert_eq!(decoder::apply(&old, &patch).unwrap(), new);
    }
}

// ---------------------------------------------------------------------------
// Identity, empty old, empty new
// ---------------------------------------------------------------------------

#[test]
fn identity_gives_zero_diff_stream() {
    let data = generate_data(20_000, 13);
    for c in codecs() {
        let patch = roundtrip(&data, &data, c);
        let decoded = DecodedPatch::parse(&patch).unwrap();
        assert_eq!(decoded.diff.len(), data.len());
        assert!(decoded.diff.iter().all(|&b| b == 0));
        assert!(decoded.extra.is_empty());
    }
}

#[test]
fn empty_old_is_single_insert() {
    let new = b"content that exists only on the new side";
    for c in codecs() {
        let patch = roundtrip(b"", new, c);
        let decoded = DecodedPatch::parse(&patch).unwrap();
        let insts: Vec<Instruction> = decoded
            .instructions()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(insts.len(), 1);
        assert_eq!(insts[0].copy_len, 0);
        assert_eq!(insts[0].insert_len as usize, new.len());
    }
}

#[test]
fn empty_new_reconstructs_nothing() {
    for c in codecs() {
        let patch = roundtrip(b"some old content", b"", c);
        assert_eq!(Header::decode(&patch).unwrap().new_size, 0);
    }
}

#[test]
fn both_empty() {
    for c in codecs() {
        roundtrip(b"", b"", c);
    }
}

// ---------------------------------------------------------------------------
// Concrete scenario
// ---------------------------------------------------------------------------

#[test]
fn single_substitution_scenario() {
    let old = b"abcabc";
    let new = b"abcXbc";
    for c in codecs() {
        let patch = roundtrip(old, new, c);
        let decoded = DecodedPatch::parse(&patch).unwrap();
        let insts: Vec<Instruction> = decoded
            .instructions()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(insts.len(), 1);
        assert_eq!(insts[0].copy_len, 6);
        assert_eq!(insts[0].insert_len, 0);
        assert_eq!(decoded.diff, vec![0, 0, 0, b'X'.wrapping_sub(b'a'), 0, 0]);
    }
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

fn shrink_ctrl_len(patch: &mut [u8], by: u64) {
    let header = Header::decode(patch).unwrap();
    let shrunk = Header {
        ctrl_len: header.ctrl_len - by,
        ..header
    };
    patch[..HEADER_LEN].copy_from_slice(&shrunk.to_bytes());
}

#[test]
fn shrunk_control_length_is_corrupt() {
    let old = generate_data(8192, 14);
    let new = mutate_data(&old, 40, 15);
    for c in codecs() {
        let mut patch = encoder::diff(&old, &new, opts(c.clone())).unwrap();
        shrink_ctrl_len(&mut patch, 1);
        let err = decoder::apply(&old, &patch).unwrap_err();
        assert!(err.is_corrupt(), "{c:?}: {err}");
    }
}

#[test]
fn shrunk_control_length_is_corrupt_even_when_lenient() {
    let old = b"abcabc";
    let new = b"abcXbc";
    let mut patch = encoder::diff(old, new, opts(Compression::None)).unwrap();
    shrink_ctrl_len(&mut patch, 4);
    let err = decoder::apply_with(old, &patch, &ApplyOptions::lenient()).unwrap_err();
    assert!(err.is_corrupt(), "{err}");
}

#[test]
fn truncated_container_fails() {
    let old = generate_data(4096, 16);
    let new = mutate_data(&old, 20, 17);
    for c in codecs() {
        let patch = encoder::diff(&old, &new, opts(c)).unwrap();
        for cut in [0, 10, HEADER_LEN, HEADER_LEN + 1, patch.len() - 1] {
            assert!(
                decoder::apply(&old, &patch[..cut]).is_err(),
                "cut at {cut} of {} accepted",
                patch.len()
            );
        }
    }
}

#[test]
fn overstated_lengths_are_underflow() {
    let mut patch = encoder::diff(b"old", b"new", opts(Compression::None)).unwrap();
    patch[8..16].copy_from_slice(&u64::MAX.to_be_bytes());
    assert!(matches!(
        decoder::apply(b"old", &patch),
        Err(PatchError::Underflow { .. })
    ));
}

#[test]
fn trailing_garbage_rejected_only_when_strict() {
    let old = b"strict mode check";
    let new = b"strict mode check!";
    let mut patch = encoder::diff(old, new, opts(Compression::None)).unwrap();
    patch.extend_from_slice(b"junk");

    assert!(decoder::apply(old, &patch).unwrap_err().is_corrupt());
    assert_eq!(
        decoder::apply_with(old, &patch, &ApplyOptions::lenient()).unwrap(),
        new
    );
}

#[test]
fn wrong_old_still_produces_new_size() {
    // The format carries no checksum: applying to a different old yields
    // output of the right length but not the right content.
    let old = generate_data(2048, 18);
    let new = mutate_data(&old, 5, 19);
    let patch = encoder::diff(&old, &new, DiffOptions::default()).unwrap();
    let other = generate_data(2048, 20);
    let out = decoder::apply(&other, &patch).unwrap();
    assert_eq!(out.len(), new.len());
    assert_ne!(out, new);
}

#[test]
fn unknown_codec_is_unsupported() {
    let mut patch = encoder::diff(b"a", b"b", opts(Compression::None)).unwrap();
    patch[7] = 0x7F;
    assert!(matches!(
        decoder::apply(b"a", &patch),
        Err(PatchError::Unsupported(_))
    ));
}

#[test]
fn random_bytes_never_panic() {
    let old = generate_data(1024, 21);
    for seed in 0..200 {
        let mut junk = generate_data(64 + seed as usize, 1000 + seed);
        if seed % 2 == 0 {
            junk[..8].copy_from_slice(b"OXDIFF1\x00");
        }
        let _ = decoder::apply(&old, &junk);
    }
}
