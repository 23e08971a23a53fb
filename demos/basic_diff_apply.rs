use oxidiff::compress::decoder;
use oxidiff::compress::encoder::{self, DiffOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let old = b"Hello from the old release";
    let new = b"Hello from the updated new release";

    let patch = encoder::diff_to(Vec::new(), old, new, DiffOptions::default())?;

    let rebuilt = decoder::apply(old, &patch)?;
    assert_eq!(rebuilt, new);

    println!(
        "new {} bytes -> patch {} bytes -> rebuilt {} bytes",
        new.len(),
        patch.len(),
        rebuilt.len()
    );

    Ok(())
}
