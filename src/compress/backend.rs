// Entropy coders for the control, diff and extra streams.
//
// Provides a pluggable `CompressBackend` trait with built-in implementations:
//   - Zlib/Deflate (via flate2, feature-gated `zlib`)
//   - LZMA (via lzma-rs, feature-gated `lzma`)
//   - NoCompression (passthrough)
//   - External/custom compressors via the trait
//
// The codec id is the last byte of the container's format tag:
//   ID 0 = none
//   ID 2 = LZMA
//   ID 3 = Zlib
// Custom backends should pick ids outside this set.

use std::io;
use std::sync::Arc;

use crate::format::PatchError;

/// Codec id for uncompressed streams.
pub const CODEC_NONE: u8 = 0;
/// Codec id for LZMA.
pub const CODEC_LZMA: u8 = 2;
/// Codec id for Zlib/Deflate.
pub const CODEC_ZLIB: u8 = 3;

// ---------------------------------------------------------------------------
// CompressBackend trait
// ---------------------------------------------------------------------------

/// A general-purpose compressor applied to each patch stream independently.
///
/// Backends see opaque byte streams and know nothing about the container.
///
/// # Implementing a custom backend
///
/// ```no_run
/// use oxidiff::compress::backend::CompressBackend;
/// use oxidiff::format::PatchError;
///
/// struct MyCompressor;
///
/// impl CompressBackend for MyCompressor {
///     fn id(&self) -> u8 { 42 }
///     fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
///         Ok(data.to_vec()) // placeholder
///     }
///     fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError> {
///         Ok(data.to_vec()) // placeholder
///     }
/// }
/// ```
pub trait CompressBackend: Send + Sync {
    /// Codec id written into the container's format tag.
    fn id(&self) -> u8;

    /// Compress one stream.
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress one stream produced by `compress()`.
    ///
    /// Truncated or otherwise undecodable input must be reported as
    /// `PatchError::Corrupt`.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError>;

    /// Decompress one stream, failing with `PatchError::Corrupt` if it decodes
    /// to more than `max_len` bytes.
    ///
    /// The default decodes the whole stream and checks afterwards. Built-in
    /// codecs stop as soon as the bound is crossed; custom codecs that read
    /// untrusted patches should do the same.
    fn decompress_bounded(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, PatchError> {
        let output = self.decompress(data)?;
        if output.len() > max_len {
            return Err(exceeds(max_len));
        }
        Ok(output)
    }
}

fn exceeds(max_len: usize) -> PatchError {
    PatchError::corrupt(format!("stream decodes past its {max_len} byte bound"))
}

// ---------------------------------------------------------------------------
// Zlib backend
// ---------------------------------------------------------------------------

/// Zlib/Deflate compressor (ID 3).
///
/// Uses the zlib wrapper rather than raw deflate so every block carries its
/// own Adler-32 trailer.
#[cfg(feature = "zlib")]
#[derive(Debug, Clone, Copy)]
pub struct ZlibBackend {
    level: flate2::Compression,
}

#[cfg(feature = "zlib")]
impl ZlibBackend {
    /// Create a Zlib backend with the given compression level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level.min(9)),
        }
    }
}

#[cfg(feature = "zlib")]
impl Default for ZlibBackend {
    fn default() -> Self {
        Self::new(6)
    }
}

#[cfg(feature = "zlib")]
impl CompressBackend for ZlibBackend {
    fn id(&self) -> u8 {
        CODEC_ZLIB
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        use flate2::write::ZlibEncoder;
        use io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError> {
        self.decompress_bounded(data, usize::MAX)
    }

    fn decompress_bounded(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, PatchError> {
        use flate2::{Decompress, FlushDecompress, Status};

        // Drive the inflater by hand so a block that ends before its stream
        // end marker, or carries trailing bytes, is rejected instead of
        // silently yielding a short result. The buffer never grows past
        // one byte over the bound.
        let limit = max_len.saturating_add(1);
        let mut inflater = Decompress::new(true);
        let mut output = Vec::with_capacity(data.len().saturating_mul(3).max(64).min(limit));
        loop {
            if output.len() > max_len {
                return Err(exceeds(max_len));
            }
            if output.len() == output.capacity() {
                let grow = output.capacity().max(64).min(limit - output.len());
                output.reserve_exact(grow);
            }
            let in_before = inflater.total_in();
            let out_before = inflater.total_out();
            let status = inflater
                .decompress_vec(&data[in_before as usize..], &mut output, FlushDecompress::None)
                .map_err(|e| PatchError::corrupt(format!("zlib decompression failed: {e}")))?;

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if inflater.total_in() == in_before && inflater.total_out() == out_before {
                        return Err(PatchError::corrupt("zlib stream is truncated"));
                    }
                }
            }
        }

        if output.len() > max_len {
            return Err(exceeds(max_len));
        }
        if inflater.total_in() as usize != data.len() {
            return Err(PatchError::corrupt(format!(
                "{} trailing bytes after zlib stream",
                data.len() - inflater.total_in() as usize
            )));
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// LZMA backend
// ---------------------------------------------------------------------------

/// LZMA compressor (ID 2).
#[cfg(feature = "lzma")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LzmaBackend;

#[cfg(feature = "lzma")]
impl CompressBackend for LzmaBackend {
    fn id(&self) -> u8 {
        CODEC_LZMA
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut input = io::Cursor::new(data);
        let mut output = Vec::new();
        lzma_rs::lzma_compress(&mut input, &mut output)?;
        Ok(output)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError> {
        self.decompress_bounded(data, usize::MAX)
    }

    fn decompress_bounded(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, PatchError> {
        let mut input = io::BufReader::new(io::Cursor::new(data));
        let mut output = CappedWriter {
            buf: Vec::new(),
            max_len,
            exceeded: false,
        };
        // The dictionary buffer fills before anything reaches the writer, so
        // it needs the same bound.
        let options = lzma_rs::decompress::Options {
            memlimit: Some(max_len),
            ..Default::default()
        };
        lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options).map_err(|e| {
            if output.exceeded {
                exceeds(max_len)
            } else {
                PatchError::corrupt(format!("LZMA decompression failed: {e}"))
            }
        })?;
        Ok(output.buf)
    }
}

/// `Write` sink that refuses to hold more than `max_len` bytes.
#[cfg(feature = "lzma")]
struct CappedWriter {
    buf: Vec<u8>,
    max_len: usize,
    exceeded: bool,
}

#[cfg(feature = "lzma")]
impl io::Write for CappedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.len() > self.max_len - self.buf.len() {
            self.exceeded = true;
            return Err(io::Error::other(format!(
                "output exceeds {} bytes",
                self.max_len
            )));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// No-compression backend
// ---------------------------------------------------------------------------

/// Passthrough "compressor" (ID 0): streams are stored as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl CompressBackend for NoCompression {
    fn id(&self) -> u8 {
        CODEC_NONE
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError> {
        Ok(data.to_vec())
    }

    fn decompress_bounded(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, PatchError> {
        if data.len() > max_len {
            return Err(exceeds(max_len));
        }
        Ok(data.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Decode-side dispatch
// ---------------------------------------------------------------------------

/// Look up a decompression backend by the codec id stored in the container.
pub fn backend_for_id(id: u8) -> Result<Box<dyn CompressBackend>, PatchError> {
    match id {
        CODEC_NONE => Ok(Box::new(NoCompression)),

        #[cfg(feature = "lzma")]
        CODEC_LZMA => Ok(Box::new(LzmaBackend)),

        #[cfg(not(feature = "lzma"))]
        CODEC_LZMA => Err(PatchError::Unsupported(
            "LZMA streams require the 'lzma' feature".into(),
        )),

        #[cfg(feature = "zlib")]
        CODEC_ZLIB => Ok(Box::new(ZlibBackend::default())),

        #[cfg(not(feature = "zlib"))]
        CODEC_ZLIB => Err(PatchError::Unsupported(
            "Zlib streams require the 'zlib' feature".into(),
        )),

        id => Err(PatchError::Unsupported(format!("unknown codec id: {id}"))),
    }
}

// ---------------------------------------------------------------------------
// Encoder-side selection
// ---------------------------------------------------------------------------

/// The entropy coder to use when writing a patch.
#[derive(Clone)]
pub enum Compression {
    /// Store streams uncompressed.
    None,
    /// Zlib/Deflate (ID 3).
    #[cfg(feature = "zlib")]
    Zlib {
        /// Zlib compression level (0-9). Default: 6.
        level: u32,
    },
    /// LZMA (ID 2).
    #[cfg(feature = "lzma")]
    Lzma,
    /// A custom backend provided by the caller.
    Custom(Arc<dyn CompressBackend>),
}

impl Default for Compression {
    fn default() -> Self {
        #[cfg(feature = "zlib")]
        {
            Self::Zlib { level: 6 }
        }
        #[cfg(not(feature = "zlib"))]
        {
            Self::None
        }
    }
}

impl std::fmt::Debug for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            #[cfg(feature = "zlib")]
            Self::Zlib { level } => write!(f, "Zlib {{ level: {level} }}"),
            #[cfg(feature = "lzma")]
            Self::Lzma => write!(f, "Lzma"),
            Self::Custom(b) => write!(f, "Custom(id={})", b.id()),
        }
    }
}

impl Compression {
    /// Return the backend implementation.
    pub fn backend(&self) -> Box<dyn CompressBackend> {
        match self {
            Self::None => Box::new(NoCompression),
            #[cfg(feature = "zlib")]
            Self::Zlib { level } => Box::new(ZlibBackend::new(*level)),
            #[cfg(feature = "lzma")]
            Self::Lzma => Box::new(LzmaBackend),
            Self::Custom(b) => Box::new(ArcBackend(b.clone())),
        }
    }

    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            #[cfg(feature = "zlib")]
            Self::Zlib { .. } => "zlib",
            #[cfg(feature = "lzma")]
            Self::Lzma => "lzma",
            Self::Custom(_) => "custom",
        }
    }
}

/// Name of the codec behind an id, for diagnostics.
pub fn codec_name(id: u8) -> &'static str {
    match id {
        CODEC_NONE => "none",
        CODEC_LZMA => "lzma",
        CODEC_ZLIB => "zlib",
        _ => "unknown",
    }
}

/// Wrapper to make `Arc<dyn CompressBackend>` implement `CompressBackend`.
struct ArcBackend(Arc<dyn CompressBackend>);

impl CompressBackend for ArcBackend {
    fn id(&self) -> u8 {
        self.0.id()
    }
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        self.0.compress(data)
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError> {
        self.0.decompress(data)
    }
    fn decompress_bounded(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, PatchError> {
        self.0.decompress_bounded(data, max_len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
