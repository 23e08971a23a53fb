// Patch creation and application.
//
// - `backend` : entropy coders for the three patch streams (Zlib, LZMA, custom)
// - `encoder` : PatchEncoder: suffix index reuse, container assembly
// - `decoder` : DecodedPatch / replay: container parsing and reconstruction

pub mod backend;
pub mod decoder;
pub mod encoder;

pub use backend::{CompressBackend, Compression};
pub use decoder::{ApplyOptions, DecodedPatch};
pub use encoder::{DiffOptions, EncodeError, PatchEncoder};
