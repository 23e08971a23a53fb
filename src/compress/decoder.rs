// Patch applier.
//
// Applying a patch is two phases:
//   - parse: validate the header, split the container into its three
//     blocks and decompress each with the codec named in the tag
//   - replay: walk the control triples, rebuilding `new` from diff + old
//     and verbatim extra bytes
//
// Every bound is checked before it is used, so a hostile patch can fail but
// cannot read outside any buffer. Decompression is capped by the declared
// new size: the diff and extra streams may not decode past `new_size` bytes,
// and the control stream may not hold more than `new_size + 1` triples.

use log::{debug, trace};

use crate::format::{ControlReader, HEADER_LEN, Header, INSTRUCTION_LEN, Instruction, PatchError};

use super::backend::{CompressBackend, backend_for_id};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for patch application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Reject patches that still have control triples, diff bytes or extra
    /// bytes left once the output is complete.
    pub strict: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl ApplyOptions {
    /// Accept trailing, unused stream content.
    pub fn lenient() -> Self {
        Self { strict: false }
    }
}

// ---------------------------------------------------------------------------
// DecodedPatch
// ---------------------------------------------------------------------------

/// A container with its three streams decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPatch {
    pub header: Header,
    pub control: Vec<u8>,
    pub diff: Vec<u8>,
    pub extra: Vec<u8>,
}

impl DecodedPatch {
    /// Parse `container`, choosing the codec from its tag.
    pub fn parse(container: &[u8]) -> Result<Self, PatchError> {
        let header = Header::decode(container)?;
        let backend = backend_for_id(header.codec_id)?;
        Self::decompress(header, container, backend.as_ref())
    }

    /// Parse `container` with a caller-supplied codec.
    ///
    /// The codec's id must match the one recorded in the container.
    pub fn parse_with_backend(
        container: &[u8],
        backend: &dyn CompressBackend,
    ) -> Result<Self, PatchError> {
        let header = Header::decode(container)?;
        if header.codec_id != backend.id() {
            return Err(PatchError::Unsupported(format!(
                "patch uses codec {}, supplied backend is codec {}",
                header.codec_id,
                backend.id()
            )));
        }
        Self::decompress(header, container, backend)
    }

    fn decompress(
        header: Header,
        container: &[u8],
        backend: &dyn CompressBackend,
    ) -> Result<Self, PatchError> {
        let (ctrl, diff, extra) = header.split_blocks(container)?;
        debug!(
            "container: {} bytes, codec {}, blocks {}/{}/{}, new size {}",
            container.len(),
            header.codec_id,
            ctrl.len(),
            diff.len(),
            extra.len(),
            header.new_size
        );

        let (ctrl_max, data_max) = stream_bounds(header.new_size);
        let patch = Self {
            header,
            control: backend.decompress_bounded(ctrl, ctrl_max)?,
            diff: backend.decompress_bounded(diff, data_max)?,
            extra: backend.decompress_bounded(extra, data_max)?,
        };
        debug!(
            "streams: ctrl {} bytes, diff {} bytes, extra {} bytes",
            patch.control.len(),
            patch.diff.len(),
            patch.extra.len()
        );
        Ok(patch)
    }

    /// Iterate the control triples.
    pub fn instructions(&self) -> Result<ControlReader<'_>, PatchError> {
        ControlReader::new(&self.control)
    }

    /// Rebuild the new sequence from `old`.
    pub fn apply(&self, old: &[u8], opts: &ApplyOptions) -> Result<Vec<u8>, PatchError> {
        replay(
            old,
            self.instructions()?,
            &self.diff,
            &self.extra,
            self.header.new_size,
            opts.strict,
        )
    }
}

/// Largest decoded control and diff/extra streams a patch for `new_size`
/// output bytes can use.
///
/// The encoder never writes an empty triple after the first one, and every
/// output byte comes from one diff or extra byte.
fn stream_bounds(new_size: u64) -> (usize, usize) {
    let ctrl = new_size
        .saturating_add(1)
        .saturating_mul(INSTRUCTION_LEN as u64);
    (
        usize::try_from(ctrl).unwrap_or(usize::MAX),
        usize::try_from(new_size).unwrap_or(usize::MAX),
    )
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Replay decoded instructions against `old`.
///
/// Produces exactly `new_size` bytes or fails with `Corrupt`. With `strict`
/// set, instructions or stream bytes left over at the end are also `Corrupt`.
pub fn replay<I>(
    old: &[u8],
    mut instructions: I,
    diff: &[u8],
    extra: &[u8],
    new_size: u64,
    strict: bool,
) -> Result<Vec<u8>, PatchError>
where
    I: Iterator<Item = Result<Instruction, PatchError>>,
{
    // Each output byte consumes exactly one diff or extra byte.
    let available = diff.len() as u64 + extra.len() as u64;
    if new_size > available {
        return Err(PatchError::corrupt(format!(
            "new size {new_size} exceeds the {available} bytes carried by the diff and extra streams"
        )));
    }
    let new_size = new_size as usize;

    let mut out = Vec::with_capacity(new_size);
    let mut diff_pos = 0usize;
    let mut extra_pos = 0usize;
    let mut old_pos = 0i64;
    let old_len = old.len() as i64;

    while out.len() < new_size {
        let inst = instructions
            .next()
            .ok_or_else(|| {
                PatchError::corrupt(format!(
                    "control stream ended at output offset {} of {new_size}",
                    out.len()
                ))
            })??;
        trace!(
            "inst copy={} insert={} seek={} at new={} old={old_pos}",
            inst.copy_len,
            inst.insert_len,
            inst.seek,
            out.len()
        );

        let copy_len = inst.copy_len as usize;
        if copy_len > new_size - out.len() {
            return Err(PatchError::corrupt(format!(
                "copy of {copy_len} bytes at offset {} runs past new size {new_size}",
                out.len()
            )));
        }
        let diff_bytes = diff.get(diff_pos..diff_pos + copy_len).ok_or_else(|| {
            PatchError::corrupt(format!(
                "diff stream exhausted: need {copy_len} bytes at {diff_pos}, have {}",
                diff.len()
            ))
        })?;
        diff_pos += copy_len;

        // Only the part of [old_pos, old_pos + copy_len) that lies inside old
        // contributes; bytes outside keep the raw diff value.
        let start = out.len();
        out.extend_from_slice(diff_bytes);
        let lo = old_pos.clamp(0, old_len);
        let hi = old_pos.saturating_add(copy_len as i64).clamp(0, old_len);
        if lo < hi {
            let dst = &mut out[start + (lo - old_pos) as usize..][..(hi - lo) as usize];
            for (d, o) in dst.iter_mut().zip(&old[lo as usize..hi as usize]) {
                *d = d.wrapping_add(*o);
            }
        }
        old_pos = old_pos.saturating_add(copy_len as i64);

        let insert_len = inst.insert_len as usize;
        if insert_len > new_size - out.len() {
            return Err(PatchError::corrupt(format!(
                "insert of {insert_len} bytes at offset {} runs past new size {new_size}",
                out.len()
            )));
        }
        let extra_bytes = extra.get(extra_pos..extra_pos + insert_len).ok_or_else(|| {
            PatchError::corrupt(format!(
                "extra stream exhausted: need {insert_len} bytes at {extra_pos}, have {}",
                extra.len()
            ))
        })?;
        out.extend_from_slice(extra_bytes);
        extra_pos += insert_len;

        old_pos = old_pos.saturating_add(inst.seek as i64);
    }

    if strict {
        if instructions.next().is_some() {
            return Err(PatchError::corrupt(
                "control stream has instructions past the end of the output",
            ));
        }
        if diff_pos != diff.len() {
            return Err(PatchError::corrupt(format!(
                "{} unused bytes left in the diff stream",
                diff.len() - diff_pos
            )));
        }
        if extra_pos != extra.len() {
            return Err(PatchError::corrupt(format!(
                "{} unused bytes left in the extra stream",
                extra.len() - extra_pos
            )));
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Rebuild the new sequence from `old` and a patch container.
pub fn apply(old: &[u8], container: &[u8]) -> Result<Vec<u8>, PatchError> {
    apply_with(old, container, &ApplyOptions::default())
}

/// [`apply`] with explicit options.
pub fn apply_with(
    old: &[u8],
    container: &[u8],
    opts: &ApplyOptions,
) -> Result<Vec<u8>, PatchError> {
    DecodedPatch::parse(container)?.apply(old, opts)
}

/// [`apply`] with a caller-supplied codec, for containers written with
/// `Compression::Custom`.
pub fn apply_with_backend(
    old: &[u8],
    container: &[u8],
    backend: &dyn CompressBackend,
    opts: &ApplyOptions,
) -> Result<Vec<u8>, PatchError> {
    DecodedPatch::parse_with_backend(container, backend)?.apply(old, opts)
}

/// Whether `data` starts with a patch header.
pub fn looks_like_patch(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN && Header::decode(data).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
