use std::sync::Arc;

use oxidiff::compress::backend::{CompressBackend, Compression};
use oxidiff::compress::decoder::{self, ApplyOptions};
use oxidiff::compress::encoder::{self, DiffOptions};
use oxidiff::format::PatchError;

struct XorBackend {
    key: u8,
}

impl CompressBackend for XorBackend {
    fn id(&self) -> u8 {
        200
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Vec<u8>> {
        Ok(data.iter().map(|b| b ^ self.key).collect())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, PatchError> {
        Ok(data.iter().map(|b| b ^ self.key).collect())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let old = b"same old content";
    let new = b"same new content with edits";

    let backend = Arc::new(XorBackend { key: 0x5A });
    let patch = encoder::diff(
        old,
        new,
        DiffOptions {
            compression: Compression::Custom(backend.clone()),
            ..Default::default()
        },
    )?;
    println!("custom codec produced a {} byte patch", patch.len());

    // Containers name the codec by id only, so the applier needs the backend.
    let rebuilt =
        decoder::apply_with_backend(old, &patch, backend.as_ref(), &ApplyOptions::default())?;
    assert_eq!(rebuilt, new);
    Ok(())
}
