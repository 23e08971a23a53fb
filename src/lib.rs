//! Oxidiff: suffix-sort binary diff/patch in Rust.
//!
//! A patch rebuilds a `new` byte sequence from an `old` one. It is a 32-byte
//! header followed by three independently compressed streams: copy/insert/seek
//! instructions, byte-wise differences for matched regions, and literal bytes
//! for everything else.
//!
//! The crate provides:
//! - Suffix array construction and longest-match lookup (`suffix`)
//! - The diff search that produces instructions (`search`)
//! - The container format (`format`)
//! - Patch creation and application (`compress`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use oxidiff::compress::encoder::{self, DiffOptions};
//! use oxidiff::compress::decoder;
//!
//! let old = b"hello old world";
//! let new = b"hello new world";
//!
//! let patch = encoder::diff(old, new, DiffOptions::default()).unwrap();
//! let rebuilt = decoder::apply(old, &patch).unwrap();
//! assert_eq!(rebuilt, new);
//! ```

pub mod compress;
pub mod format;
pub mod io;
pub mod search;
pub mod suffix;

#[cfg(feature = "cli")]
pub mod cli;

pub use compress::decoder::{apply, apply_with};
pub use compress::encoder::diff;
pub use compress::{ApplyOptions, Compression, DiffOptions, EncodeError};
pub use format::PatchError;
