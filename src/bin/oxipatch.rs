// Minimal patch applier: `oxipatch OLD NEW PATCH`.
//
// Reads OLD and PATCH, writes the reconstructed NEW. Any other argument count
// prints usage and exits non-zero.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use oxidiff::compress::decoder::ApplyOptions;

/// Apply an oxidiff patch.
#[derive(Parser, Debug)]
#[command(name = "oxipatch", version, about = "Apply an oxidiff patch")]
struct Args {
    /// Old file.
    old: PathBuf,
    /// New file to write.
    new: PathBuf,
    /// Patch file.
    patch: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    match oxidiff::io::patch_file(&args.old, &args.patch, &args.new, &ApplyOptions::default()) {
        Ok(stats) => {
            log::info!(
                "wrote {} bytes to {}",
                stats.output_size,
                args.new.display()
            );
        }
        Err(e) => {
            eprintln!("oxipatch: {}: {e}", args.patch.display());
            process::exit(1);
        }
    }
}
