// Control stream: flat (copy_len, insert_len, seek) triples, each field a
// big-endian i32, 12 bytes per instruction.

use super::error::PatchError;

/// Encoded size of one instruction.
pub const INSTRUCTION_LEN: usize = 12;

/// One copy/insert/seek step of a patch.
///
/// Replaying it produces `copy_len` bytes of `diff + old` followed by
/// `insert_len` bytes taken verbatim from the extra stream, then moves the
/// old cursor by `seek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instruction {
    pub copy_len: u32,
    pub insert_len: u32,
    pub seek: i32,
}

impl Instruction {
    pub fn new(copy_len: u32, insert_len: u32, seek: i32) -> Self {
        Self {
            copy_len,
            insert_len,
            seek,
        }
    }

    /// Output bytes produced by this instruction.
    pub fn output_len(&self) -> u64 {
        self.copy_len as u64 + self.insert_len as u64
    }

    /// Append the 12-byte wire form to `out`.
    ///
    /// Lengths must fit in a non-negative i32; the search engine guarantees
    /// this by refusing inputs larger than `i32::MAX`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        debug_assert!(self.copy_len <= i32::MAX as u32);
        debug_assert!(self.insert_len <= i32::MAX as u32);
        out.extend_from_slice(&(self.copy_len as i32).to_be_bytes());
        out.extend_from_slice(&(self.insert_len as i32).to_be_bytes());
        out.extend_from_slice(&self.seek.to_be_bytes());
    }

    /// Decode one instruction from exactly 12 bytes.
    pub fn decode(bytes: &[u8; INSTRUCTION_LEN]) -> Result<Self, PatchError> {
        let field = |i: usize| i32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        let copy_len = field(0);
        let insert_len = field(4);
        let seek = field(8);

        if copy_len < 0 || insert_len < 0 {
            return Err(PatchError::corrupt(format!(
                "negative length in control triple ({copy_len}, {insert_len}, {seek})"
            )));
        }

        Ok(Self {
            copy_len: copy_len as u32,
            insert_len: insert_len as u32,
            seek,
        })
    }
}

/// Serialize a whole instruction list into a control stream.
pub fn encode_all(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(instructions.len() * INSTRUCTION_LEN);
    for inst in instructions {
        inst.encode_into(&mut out);
    }
    out
}

/// Iterates the instructions of a decompressed control stream in order.
///
/// Construction rejects a stream whose length is not a whole number of
/// triples, so the iterator itself only fails on invalid field values.
#[derive(Debug, Clone)]
pub struct ControlReader<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
}

impl<'a> ControlReader<'a> {
    pub fn new(stream: &'a [u8]) -> Result<Self, PatchError> {
        if stream.len() % INSTRUCTION_LEN != 0 {
            return Err(PatchError::corrupt(format!(
                "control stream length {} is not a multiple of {INSTRUCTION_LEN}",
                stream.len()
            )));
        }
        Ok(Self {
            chunks: stream.chunks_exact(INSTRUCTION_LEN),
        })
    }

    /// Instructions not yet read.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl Iterator for ControlReader<'_> {
    type Item = Result<Instruction, PatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        let mut buf = [0u8; INSTRUCTION_LEN];
        buf.copy_from_slice(chunk);
        Some(Instruction::decode(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        let mut out = Vec::new();
        Instruction::new(6, 0, -2).encode_into(&mut out);
        assert_eq!(
            out,
            vec![0, 0, 0, 6, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFE]
        );
    }

    #[test]
    fn reader_yields_in_order() {
        let insts = vec![
            Instruction::new(10, 3, 7),
            Instruction::new(0, 5, -100),
            Instruction::new(i32::MAX as u32, 0, i32::MIN),
        ];
        let stream = encode_all(&insts);
        let mut reader = ControlReader::new(&stream).unwrap();
        assert_eq!(reader.remaining(), 3);
        let decoded: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(decoded, insts);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn partial_triple_is_corrupt() {
        let stream = encode_all(&[Instruction::new(1, 2, 3)]);
        let err = ControlReader::new(&stream[..11]).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn negative_lengths_are_corrupt() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&(-1i32).to_be_bytes());
        stream.extend_from_slice(&0i32.to_be_bytes());
        stream.extend_from_slice(&0i32.to_be_bytes());
        let mut reader = ControlReader::new(&stream).unwrap();
        assert!(reader.next().unwrap().unwrap_err().is_corrupt());
    }

    #[test]
    fn output_len_sums_both_parts() {
        assert_eq!(Instruction::new(u32::MAX, u32::MAX, 0).output_len(), 2 * u32::MAX as u64);
    }
}
