// Patch container header (32 bytes, all fields big-endian).
//
//   offset  size  field
//   0       7     format tag "OXDIFF1"
//   7       1     codec id of the entropy coder used for all three blocks
//   8       8     compressed control block length
//   16      8     compressed diff block length
//   24      8     reconstructed (new) size
//
// The extra block runs from the end of the diff block to the end of the
// container, so its length is implicit.

use std::io::{self, Write};

use super::error::{PatchError, Stream};

/// ASCII format tag; the eighth magic byte is the codec id.
pub const FORMAT_TAG: [u8; 7] = *b"OXDIFF1";

/// Total header size in bytes.
pub const HEADER_LEN: usize = 32;

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Entropy coder id (see `compress::backend`).
    pub codec_id: u8,
    /// Compressed length of the control block.
    pub ctrl_len: u64,
    /// Compressed length of the diff block.
    pub diff_len: u64,
    /// Size of the reconstructed new sequence.
    pub new_size: u64,
}

impl Header {
    /// Serialize to the fixed 32-byte form.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..7].copy_from_slice(&FORMAT_TAG);
        buf[7] = self.codec_id;
        buf[8..16].copy_from_slice(&self.ctrl_len.to_be_bytes());
        buf[16..24].copy_from_slice(&self.diff_len.to_be_bytes());
        buf[24..32].copy_from_slice(&self.new_size.to_be_bytes());
        buf
    }

    /// Write the header to `w`.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    /// Parse and validate the header at the start of `container`.
    pub fn decode(container: &[u8]) -> Result<Self, PatchError> {
        if container.len() < HEADER_LEN {
            return Err(PatchError::corrupt(format!(
                "container is {} bytes, shorter than the {HEADER_LEN}-byte header",
                container.len()
            )));
        }
        if container[..7] != FORMAT_TAG {
            return Err(PatchError::corrupt(format!(
                "bad format tag {:02X?}",
                &container[..7]
            )));
        }

        Ok(Self {
            codec_id: container[7],
            ctrl_len: read_u64(&container[8..16]),
            diff_len: read_u64(&container[16..24]),
            new_size: read_u64(&container[24..32]),
        })
    }

    /// Split `container` into its compressed control, diff and extra blocks.
    ///
    /// A declared length that runs past the end of the container is an
    /// `Underflow`.
    pub fn split_blocks<'a>(
        &self,
        container: &'a [u8],
    ) -> Result<(&'a [u8], &'a [u8], &'a [u8]), PatchError> {
        let body = &container[HEADER_LEN..];
        let available = body.len() as u64;

        if self.ctrl_len > available {
            return Err(PatchError::Underflow {
                stream: Stream::Control,
                declared: self.ctrl_len,
                available,
            });
        }
        let ctrl_len = self.ctrl_len as usize;
        let (ctrl, rest) = body.split_at(ctrl_len);

        let remaining = rest.len() as u64;
        if self.diff_len > remaining {
            return Err(PatchError::Underflow {
                stream: Stream::Diff,
                declared: self.diff_len,
                available: remaining,
            });
        }
        let (diff, extra) = rest.split_at(self.diff_len as usize);

        Ok((ctrl, diff, extra))
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            codec_id: 3,
            ctrl_len: 5,
            diff_len: 2,
            new_size: 0x0102_0304_0506_0708,
        }
    }

    #[test]
    fn layout_is_big_endian() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[..8], b"OXDIFF1\x03");
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(&bytes[16..24], &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&bytes[24..32], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn decode_reads_back_fields() {
        let mut container = sample().to_bytes().to_vec();
        container.extend_from_slice(b"cccccddeee");
        let hdr = Header::decode(&container).unwrap();
        assert_eq!(hdr, sample());

        let (ctrl, diff, extra) = hdr.split_blocks(&container).unwrap();
        assert_eq!(ctrl, b"ccccc");
        assert_eq!(diff, b"dd");
        assert_eq!(extra, b"eee");
    }

    #[test]
    fn short_container_is_corrupt() {
        let err = Header::decode(&[0u8; 12]).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn bad_tag_is_corrupt() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(Header::decode(&bytes).unwrap_err().is_corrupt());
    }

    #[test]
    fn oversized_lengths_underflow() {
        let mut container = sample().to_bytes().to_vec();
        container.extend_from_slice(b"ccc");
        let hdr = Header::decode(&container).unwrap();
        match hdr.split_blocks(&container) {
            Err(PatchError::Underflow {
                stream: Stream::Control,
                declared: 5,
                available: 3,
            }) => {}
            other => panic!("unexpected {other:?}"),
        }

        let mut container = sample().to_bytes().to_vec();
        container.extend_from_slice(b"ccccc");
        let hdr = Header::decode(&container).unwrap();
        assert!(matches!(
            hdr.split_blocks(&container),
            Err(PatchError::Underflow {
                stream: Stream::Diff,
                ..
            })
        ));
    }
}
