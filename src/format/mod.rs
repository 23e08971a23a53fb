// Patch container format.
//
// - `header`  : 32-byte container header and block splitting
// - `control` : instruction triples and the control stream codec
// - `error`   : PatchError raised while reading/applying patches

pub mod control;
pub mod error;
pub mod header;

pub use control::{ControlReader, INSTRUCTION_LEN, Instruction};
pub use error::{PatchError, Stream};
pub use header::{FORMAT_TAG, HEADER_LEN, Header};
