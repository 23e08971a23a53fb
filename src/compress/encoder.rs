// Patch encoder.
//
// PatchEncoder indexes the old sequence once and can then produce any number
// of patches against it:
//   - the search engine turns (old, new) into a Delta
//   - the Delta's instructions are serialized into the control stream
//   - control, diff and extra are compressed independently
//   - header + three blocks are written in order ctrl, diff, extra

use std::io::{self, Write};

use log::debug;
use thiserror::Error;

use crate::format::{Header, control};
use crate::search::config::SearchConfig;
use crate::search::engine::{self, Delta};
use crate::suffix::SuffixIndex;

use super::backend::{CompressBackend, Compression};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for patch creation.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Search thresholds.
    pub search: SearchConfig,
    /// Entropy coder applied to each stream.
    pub compression: Compression,
}

impl DiffOptions {
    /// Options using the search profile for `level` (0-9).
    pub fn with_level(level: u32) -> Self {
        Self {
            search: crate::search::config::config_for_level(level),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to produce a patch.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The entropy coder or the output writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An input is too large for the 32-bit control fields.
    #[error("{what} sequence is {len} bytes; the patch format supports at most {max}", max = i32::MAX)]
    InputTooLarge { what: &'static str, len: usize },
}

fn check_len(what: &'static str, data: &[u8]) -> Result<(), EncodeError> {
    if data.len() > i32::MAX as usize {
        return Err(EncodeError::InputTooLarge {
            what,
            len: data.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PatchEncoder
// ---------------------------------------------------------------------------

/// Patch encoder bound to one old sequence.
///
/// Building the suffix index dominates the cost of a diff, so diffing several
/// new sequences against the same old should reuse one encoder.
pub struct PatchEncoder<'o> {
    old: &'o [u8],
    index: SuffixIndex,
    opts: DiffOptions,
}

impl<'o> PatchEncoder<'o> {
    /// Index `old` for diffing.
    pub fn new(old: &'o [u8], opts: DiffOptions) -> Result<Self, EncodeError> {
        check_len("old", old)?;
        let index = SuffixIndex::build(old);
        debug!("indexed {} old bytes ({} profile)", old.len(), opts.search.name);
        Ok(Self { old, index, opts })
    }

    /// The old sequence this encoder diffs against.
    pub fn old(&self) -> &'o [u8] {
        self.old
    }

    /// Run the search for `new` without encoding.
    pub fn delta(&self, new: &[u8]) -> Result<Delta, EncodeError> {
        check_len("new", new)?;
        Ok(engine::compute_delta(
            self.old,
            new,
            &self.index,
            &self.opts.search,
        ))
    }

    /// Write a complete patch for `new` to `writer`.
    pub fn encode_to<W: Write>(&self, writer: W, new: &[u8]) -> Result<W, EncodeError> {
        let delta = self.delta(new)?;
        encode_delta(writer, &delta, new.len() as u64, &self.opts.compression)
    }

    /// Produce a complete patch for `new` in memory.
    pub fn encode(&self, new: &[u8]) -> Result<Vec<u8>, EncodeError> {
        self.encode_to(Vec::new(), new)
    }
}

// ---------------------------------------------------------------------------
// Container assembly
// ---------------------------------------------------------------------------

/// Serialize and compress a Delta, writing the container to `writer`.
pub fn encode_delta<W: Write>(
    mut writer: W,
    delta: &Delta,
    new_size: u64,
    compression: &Compression,
) -> Result<W, EncodeError> {
    debug_assert_eq!(delta.output_len(), new_size);

    let backend = compression.backend();
    let ctrl = control::encode_all(&delta.instructions);
    let (ctrl_block, diff_block, extra_block) =
        compress_streams(backend.as_ref(), &ctrl, &delta.diff, &delta.extra)?;

    let header = Header {
        codec_id: backend.id(),
        ctrl_len: ctrl_block.len() as u64,
        diff_len: diff_block.len() as u64,
        new_size,
    };
    header.encode(&mut writer)?;
    writer.write_all(&ctrl_block)?;
    writer.write_all(&diff_block)?;
    writer.write_all(&extra_block)?;

    debug!(
        "patch ({}): ctrl {} -> {}, diff {} -> {}, extra {} -> {}",
        compression.name(),
        ctrl.len(),
        ctrl_block.len(),
        delta.diff.len(),
        diff_block.len(),
        delta.extra.len(),
        extra_block.len()
    );

    Ok(writer)
}

#[cfg(not(feature = "parallel"))]
fn compress_streams(
    backend: &dyn CompressBackend,
    ctrl: &[u8],
    diff: &[u8],
    extra: &[u8],
) -> io::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    Ok((
        backend.compress(ctrl)?,
        backend.compress(diff)?,
        backend.compress(extra)?,
    ))
}

/// The three streams are independent, so they compress concurrently.
#[cfg(feature = "parallel")]
fn compress_streams(
    backend: &dyn CompressBackend,
    ctrl: &[u8],
    diff: &[u8],
    extra: &[u8],
) -> io::Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let (c, (d, e)) = rayon::join(
        || backend.compress(ctrl),
        || rayon::join(|| backend.compress(diff), || backend.compress(extra)),
    );
    Ok((c?, d?, e?))
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Convenience: diff `new` against `old`, writing the patch to `writer`.
pub fn diff_to<W: Write>(
    writer: W,
    old: &[u8],
    new: &[u8],
    opts: DiffOptions,
) -> Result<W, EncodeError> {
    PatchEncoder::new(old, opts)?.encode_to(writer, new)
}

/// Convenience: diff `new` against `old` in memory.
pub fn diff(old: &[u8], new: &[u8], opts: DiffOptions) -> Result<Vec<u8>, EncodeError> {
    diff_to(Vec::new(), old, new, opts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::decoder;
    use crate::format::{HEADER_LEN, Instruction};

    fn roundtrip(old: &[u8], new: &[u8], opts: DiffOptions) -> Vec<u8> {
        let patch = diff(old, new, opts).unwrap();
        decoder::apply(old, &patch).unwrap()
    }

    fn stored() -> DiffOptions {
        DiffOptions {
            compression: Compression::None,
            ..Default::default()
        }
    }

    #[test]
    fn diff_apply_roundtrip() {
        let old = b"The quick brown fox jumps over the lazy dog. 1234567890";
        let new = b"The quick brown cat sits on the lazy mat. 1234567890!!!";
        assert_eq!(roundtrip(old, new, DiffOptions::default()), new);
    }

    #[test]
    fn stored_layout_matches_streams() {
        let old = b"abcabc";
        let new = b"abcXbc";
        let patch = diff(old, new, stored()).unwrap();

        let header = Header::decode(&patch).unwrap();
        assert_eq!(header.codec_id, 0);
        assert_eq!(header.ctrl_len, 12);
        assert_eq!(header.diff_len, 6);
        assert_eq!(header.new_size, 6);
        assert_eq!(patch.len(), HEADER_LEN + 12 + 6);

        let ctrl = &patch[HEADER_LEN..HEADER_LEN + 12];
        assert_eq!(&ctrl[..8], &[0, 0, 0, 6, 0, 0, 0, 0]);
        let diff = &patch[HEADER_LEN + 12..];
        assert_eq!(diff, &[0, 0, 0, b'X'.wrapping_sub(b'a'), 0, 0]);
    }

    #[test]
    fn encoder_reuses_index() {
        let old: Vec<u8> = (0..=255u8).cycle().take(8192).collect();
        let encoder = PatchEncoder::new(&old, DiffOptions::default()).unwrap();
        assert_eq!(encoder.old().len(), old.len());

        for stride in [17usize, 256, 1000] {
            let mut new = old.clone();
            for i in (0..new.len()).step_by(stride) {
                new[i] ^= 0xFF;
            }
            let patch = encoder.encode(&new).unwrap();
            assert_eq!(decoder::apply(&old, &patch).unwrap(), new);
        }
    }

    #[test]
    fn encode_delta_uses_backend_id() {
        let delta = Delta {
            instructions: vec![Instruction::new(0, 3, 0)],
            diff: Vec::new(),
            extra: b"xyz".to_vec(),
        };
        let patch = encode_delta(Vec::new(), &delta, 3, &Compression::None).unwrap();
        assert_eq!(&patch[..8], b"OXDIFF1\x00");
        assert_eq!(decoder::apply(b"", &patch).unwrap(), b"xyz");
    }

    #[test]
    fn all_levels_roundtrip() {
        let old: Vec<u8> = b"version 1 of the payload; "
            .iter()
            .copied()
            .cycle()
            .take(4000)
            .collect();
        let mut new = old.clone();
        new[1234] = b'#';
        new.extend_from_slice(b"appendix");
        for level in 0..=9 {
            assert_eq!(roundtrip(&old, &new, DiffOptions::with_level(level)), new, "level {level}");
        }
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(roundtrip(b"", b"", DiffOptions::default()), b"");
        assert_eq!(roundtrip(b"old", b"", DiffOptions::default()), b"");
        assert_eq!(roundtrip(b"", b"new", DiffOptions::default()), b"new");
    }

    #[cfg(feature = "zlib")]
    #[test]
    fn zlib_roundtrip() {
        let old: Vec<u8> = (0..10_000u32).map(|i| (i % 97) as u8).collect();
        let mut new = old.clone();
        new[5000] = 0xFF;
        let opts = DiffOptions {
            compression: Compression::Zlib { level: 9 },
            ..Default::default()
        };
        let patch = diff(&old, &new, opts).unwrap();
        assert!(patch.len() < 200, "patch is {} bytes", patch.len());
        assert_eq!(decoder::apply(&old, &patch).unwrap(), new);
    }

    #[cfg(feature = "lzma")]
    #[test]
    fn lzma_roundtrip() {
        let old: Vec<u8> = (0..10_000u32).map(|i| (i % 89) as u8).collect();
        let mut new = old.clone();
        new.truncate(9000);
        let opts = DiffOptions {
            compression: Compression::Lzma,
            ..Default::default()
        };
        assert_eq!(roundtrip(&old, &new, opts), new);
    }

    #[test]
    fn custom_backend_roundtrip() {
        use std::sync::Arc;

        struct Xor;
        impl CompressBackend for Xor {
            fn id(&self) -> u8 {
                200
            }
            fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
                Ok(data.iter().map(|b| b ^ 0xA5).collect())
            }
            fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, crate::format::PatchError> {
                Ok(data.iter().map(|b| b ^ 0xA5).collect())
            }
        }

        let old = b"custom backend source text";
        let new = b"custom backend target text";
        let opts = DiffOptions {
            compression: Compression::Custom(Arc::new(Xor)),
            ..Default::default()
        };
        let patch = diff(old, new, opts).unwrap();
        assert_eq!(patch[7], 200);
        let out = decoder::apply_with_backend(old, &patch, &Xor, &Default::default()).unwrap();
        assert_eq!(out, new);
    }
}
