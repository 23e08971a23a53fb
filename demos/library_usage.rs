use oxidiff::compress::decoder::{ApplyOptions, DecodedPatch};
use oxidiff::compress::encoder::{DiffOptions, PatchEncoder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let old = b"ABCD-ABCD-ABCD-ABCD";
    let targets: [&[u8]; 2] = [b"ABCD-XXXX-ABCD-YYYY", b"ABCD-ABCD-ZZ-ABCD-ABCD"];

    // One index over old serves every target.
    let encoder = PatchEncoder::new(old, DiffOptions::with_level(9))?;
    for new in targets {
        let patch = encoder.encode(new)?;

        let decoded = DecodedPatch::parse(&patch)?;
        let out = decoded.apply(old, &ApplyOptions::default())?;
        assert_eq!(out, new);

        println!(
            "patch {} bytes: {} instructions, {} diff bytes, {} extra bytes",
            patch.len(),
            decoded.instructions()?.remaining(),
            decoded.diff.len(),
            decoded.extra.len()
        );
    }
    Ok(())
}
