// Command-line front end for Oxidiff.
//
// Subcommands create, apply and inspect patches. All file work goes through
// the `io` helpers; this module only maps flags to options and reports.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::compress::backend::{Compression, codec_name};
use crate::compress::decoder::{ApplyOptions, DecodedPatch};
use crate::compress::encoder::DiffOptions;
use crate::format::{HEADER_LEN, Header, PatchError};
use crate::io::{self as file_io, IoError};
use crate::search::config::config_for_level;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_LEVEL: u32 = 6;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Suffix-sort binary diff/patch tool.
#[derive(Parser, Debug)]
#[command(
    name = "oxidiff",
    version,
    about = "Binary diff/patch with compressed control, diff and extra streams",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a patch that turns OLD into NEW.
    Diff(DiffArgs),
    /// Apply PATCH to OLD, writing NEW.
    Patch(PatchArgs),
    /// Print the header and stream layout of a patch.
    Info(InfoArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    None,
    Zlib,
    Lzma,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Search effort (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Entropy coder for the patch streams.
    #[arg(long, short = 'c', value_enum, default_value_t = CompressionArg::Zlib)]
    compression: CompressionArg,

    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Accept patches with unused trailing stream content.
    #[arg(long)]
    lenient: bool,

    /// Old file.
    #[arg(value_hint = ValueHint::FilePath)]
    old: PathBuf,

    /// New file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Also list every control triple.
    #[arg(long, short = 'i')]
    instructions: bool,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Diff,
    Patch,
    Info,
    Config,
}

struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    level: u32,
    compression: CompressionArg,
    lenient: bool,
    show_instructions: bool,
    old_file: Option<PathBuf>,
    new_file: Option<PathBuf>,
    patch_file: Option<PathBuf>,
}

impl Options {
    fn base(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            level: DEFAULT_LEVEL,
            compression: CompressionArg::Zlib,
            lenient: false,
            show_instructions: false,
            old_file: None,
            new_file: None,
            patch_file: None,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Diff(args) => Options {
            level: args.level,
            compression: args.compression,
            old_file: Some(args.old.clone()),
            new_file: Some(args.new.clone()),
            patch_file: Some(args.patch.clone()),
            ..Options::base(Command::Diff, &cli)
        },
        Cmd::Patch(args) => Options {
            lenient: args.lenient,
            old_file: Some(args.old.clone()),
            new_file: Some(args.new.clone()),
            patch_file: Some(args.patch.clone()),
            ..Options::base(Command::Patch, &cli)
        },
        Cmd::Info(args) => Options {
            show_instructions: args.instructions,
            patch_file: Some(args.patch.clone()),
            ..Options::base(Command::Info, &cli)
        },
        Cmd::Config => Options::base(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxidiff".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = build_diff_options(&opts);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxidiff version {version} (Rust), Copyright (C) oxidiff contributors");
    eprintln!("Licensed under the MIT License");

    let lzma = cfg!(feature = "lzma") as u8;
    let zlib = cfg!(feature = "zlib") as u8;
    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("CODEC_LZMA={lzma}");
    eprintln!("CODEC_ZLIB={zlib}");
    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    eprintln!("HEADER_LEN={HEADER_LEN}");
    eprintln!("MAX_INPUT={}", i32::MAX);
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Build DiffOptions from CLI options
// ---------------------------------------------------------------------------

fn build_diff_options(opts: &Options) -> DiffOptions {
    let compression = match opts.compression {
        CompressionArg::None => Compression::None,

        #[cfg(feature = "zlib")]
        CompressionArg::Zlib => Compression::Zlib { level: opts.level },

        #[cfg(feature = "lzma")]
        CompressionArg::Lzma => Compression::Lzma,

        #[allow(unreachable_patterns)]
        other => {
            if !opts.quiet {
                eprintln!("oxidiff: warning: {other:?} support not compiled in, storing streams uncompressed");
            }
            Compression::None
        }
    };

    DiffOptions {
        search: config_for_level(opts.level),
        compression,
    }
}

fn refuse_overwrite(path: &Path, opts: &Options) -> bool {
    if path.exists() && !opts.force {
        eprintln!(
            "oxidiff: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return true;
    }
    false
}

fn hex(digest: Option<[u8; 32]>) -> Option<String> {
    digest.map(|d| d.iter().map(|b| format!("{b:02x}")).collect())
}

fn require<'a>(path: &'a Option<PathBuf>, what: &str) -> Option<&'a Path> {
    let path = path.as_deref();
    if path.is_none() {
        eprintln!("oxidiff: missing {what} file");
    }
    path
}

// ---------------------------------------------------------------------------
// Diff command
// ---------------------------------------------------------------------------

fn cmd_diff(opts: &Options) -> i32 {
    let (Some(old), Some(new), Some(patch)) = (
        require(&opts.old_file, "old"),
        require(&opts.new_file, "new"),
        require(&opts.patch_file, "patch"),
    ) else {
        return 1;
    };
    if refuse_overwrite(patch, opts) {
        return 1;
    }

    let diff_opts = build_diff_options(opts);
    let profile = diff_opts.search.name;
    let codec = diff_opts.compression.name();

    let stats = match file_io::diff_file(old, new, patch, diff_opts) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("oxidiff: diff: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxidiff: diff: old size: {}, new size: {}, patch size: {}, \
             instructions: {}, extra bytes: {}",
            stats.old_size, stats.new_size, stats.patch_size, stats.instructions, stats.extra_bytes
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "diff",
            "old_size": stats.old_size,
            "new_size": stats.new_size,
            "patch_size": stats.patch_size,
            "instructions": stats.instructions,
            "diff_bytes": stats.diff_bytes,
            "extra_bytes": stats.extra_bytes,
            "level": opts.level,
            "profile": profile,
            "compression": codec,
            "old_sha256": hex(stats.old_sha256),
            "new_sha256": hex(stats.new_sha256),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Patch command
// ---------------------------------------------------------------------------

fn cmd_patch(opts: &Options) -> i32 {
    let (Some(old), Some(new), Some(patch)) = (
        require(&opts.old_file, "old"),
        require(&opts.new_file, "new"),
        require(&opts.patch_file, "patch"),
    ) else {
        return 1;
    };
    if refuse_overwrite(new, opts) {
        return 1;
    }

    let apply_opts = ApplyOptions {
        strict: !opts.lenient,
    };
    let stats = match file_io::patch_file(old, patch, new, &apply_opts) {
        Ok(stats) => stats,
        Err(IoError::Patch(e)) => {
            eprintln!("oxidiff: patch: {}: {e}", patch.display());
            return 1;
        }
        Err(e) => {
            eprintln!("oxidiff: patch: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxidiff: patch: old size: {}, patch size: {}, output size: {}",
            stats.old_size, stats.patch_size, stats.output_size
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "patch",
            "old_size": stats.old_size,
            "patch_size": stats.patch_size,
            "output_size": stats.output_size,
            "strict": apply_opts.strict,
            "output_sha256": hex(stats.output_sha256),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn cmd_info(opts: &Options) -> i32 {
    let Some(path) = require(&opts.patch_file, "patch") else {
        return 1;
    };
    let container = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("oxidiff: {}: {e}", path.display());
            return 1;
        }
    };

    let header = match Header::decode(&container) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("oxidiff: invalid patch header: {e}");
            return 1;
        }
    };
    let extra_block = extra_block_len(container.len(), &header);

    println!("Patch size:                   {}", container.len());
    println!(
        "Codec:                        {} (id={})",
        codec_name(header.codec_id),
        header.codec_id
    );
    println!("Control block size:           {}", header.ctrl_len);
    println!("Diff block size:              {}", header.diff_len);
    println!("Extra block size:             {extra_block}");
    println!("New size:                     {}", header.new_size);

    let decoded = match DecodedPatch::parse(&container) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("oxidiff: {}: {e}", path.display());
            return 1;
        }
    };
    let reader = match decoded.instructions() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxidiff: {}: {e}", path.display());
            return 1;
        }
    };
    let count = reader.remaining();

    println!("Control stream length:        {}", decoded.control.len());
    println!("Diff stream length:           {}", decoded.diff.len());
    println!("Extra stream length:          {}", decoded.extra.len());
    println!("Instructions:                 {count}");

    if opts.show_instructions
        && let Err(e) = print_instructions(reader)
    {
        eprintln!("oxidiff: {}: {e}", path.display());
        return 1;
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "info",
            "patch_size": container.len(),
            "codec": codec_name(header.codec_id),
            "codec_id": header.codec_id,
            "ctrl_block": header.ctrl_len,
            "diff_block": header.diff_len,
            "extra_block": extra_block,
            "new_size": header.new_size,
            "ctrl_len": decoded.control.len(),
            "diff_len": decoded.diff.len(),
            "extra_len": decoded.extra.len(),
            "instructions": count,
        });
        eprintln!("{json:#}");
    }

    0
}

/// Bytes left for the extra block once the declared ctrl and diff blocks are
/// taken; the header lengths are untrusted.
fn extra_block_len(container_len: usize, header: &Header) -> u64 {
    let body = container_len.saturating_sub(HEADER_LEN) as u64;
    body.saturating_sub(header.ctrl_len.saturating_add(header.diff_len))
}

fn print_instructions(reader: crate::format::ControlReader<'_>) -> Result<(), PatchError> {
    println!();
    println!("  Offset      Copy        Insert      Seek");
    let mut new_pos = 0u64;
    for inst in reader {
        let inst = inst?;
        println!(
            "  {new_pos:010}  {:<10}  {:<10}  {:+}",
            inst.copy_len, inst.insert_len, inst.seek
        );
        new_pos += inst.output_len();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(opts.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let exit_code = match opts.command {
        Command::Diff => cmd_diff(&opts),
        Command::Patch => cmd_patch(&opts),
        Command::Info => cmd_info(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
