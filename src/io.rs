// File-level helpers for creating and applying patches.
//
// Provides `diff_file()` and `patch_file()`, which read their inputs fully
// into memory (the suffix index and the applier both need random access to
// old) and write through a `BufWriter`. Optionally computes SHA-256
// checksums (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::compress::decoder::{ApplyOptions, DecodedPatch};
use crate::compress::encoder::{DiffOptions, EncodeError, PatchEncoder};
use crate::format::PatchError;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `diff_file()`.
#[derive(Debug, Clone)]
pub struct DiffStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// New file size in bytes.
    pub new_size: u64,
    /// Patch size in bytes.
    pub patch_size: u64,
    /// Number of control triples written.
    pub instructions: u64,
    /// Uncompressed diff stream length.
    pub diff_bytes: u64,
    /// Uncompressed extra stream length.
    pub extra_bytes: u64,
    /// SHA-256 of the old file (if `file-io` feature is enabled).
    pub old_sha256: Option<[u8; 32]>,
    /// SHA-256 of the new file (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `patch_file()`.
#[derive(Debug, Clone)]
pub struct PatchStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Patch creation error.
    #[error("diff error: {0}")]
    Encode(#[from] EncodeError),
    /// Patch application error.
    #[error("patch error: {0}")]
    Patch(#[from] PatchError),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// diff_file
// ---------------------------------------------------------------------------

/// Create a patch turning `old_path` into `new_path`, writing it to
/// `patch_path`.
pub fn diff_file(
    old_path: &Path,
    new_path: &Path,
    patch_path: &Path,
    opts: DiffOptions,
) -> Result<DiffStats, IoError> {
    let old = std::fs::read(old_path)?;
    let new = std::fs::read(new_path)?;

    let encoder = PatchEncoder::new(&old, opts.clone())?;
    let delta = encoder.delta(&new)?;

    let patch_file = File::create(patch_path)?;
    let writer = BufWriter::with_capacity(BUF_SIZE, patch_file);
    let writer = crate::compress::encoder::encode_delta(
        writer,
        &delta,
        new.len() as u64,
        &opts.compression,
    )?;
    let patch_size = writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .metadata()?
        .len();

    Ok(DiffStats {
        old_size: old.len() as u64,
        new_size: new.len() as u64,
        patch_size,
        instructions: delta.instructions.len() as u64,
        diff_bytes: delta.diff.len() as u64,
        extra_bytes: delta.extra.len() as u64,
        old_sha256: sha256(&old),
        new_sha256: sha256(&new),
    })
}

// ---------------------------------------------------------------------------
// patch_file
// ---------------------------------------------------------------------------

/// Apply the patch at `patch_path` to `old_path`, writing the result to
/// `output_path`.
///
/// The output file is only created once the patch has replayed cleanly, so
/// a corrupt patch never leaves a partial file behind.
pub fn patch_file(
    old_path: &Path,
    patch_path: &Path,
    output_path: &Path,
    opts: &ApplyOptions,
) -> Result<PatchStats, IoError> {
    let old = std::fs::read(old_path)?;
    let container = std::fs::read(patch_path)?;

    let output = DecodedPatch::parse(&container)?.apply(&old, opts)?;

    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    writer.write_all(&output)?;
    writer.flush()?;

    Ok(PatchStats {
        old_size: old.len() as u64,
        patch_size: container.len() as u64,
        output_size: output.len() as u64,
        output_sha256: sha256(&output),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
