// Errors raised while reading or applying a patch.

use std::fmt;

use thiserror::Error;

/// One of the three streams carried by a patch container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Control,
    Diff,
    Extra,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => f.write_str("control"),
            Self::Diff => f.write_str("diff"),
            Self::Extra => f.write_str("extra"),
        }
    }
}

/// Failure to parse or apply a patch. Every variant is fatal to the
/// operation in progress; no partial output is returned.
#[derive(Debug, Error)]
pub enum PatchError {
    /// I/O failure while reading the container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The patch is structurally invalid or does not replay cleanly.
    #[error("corrupt patch: {0}")]
    Corrupt(String),

    /// A header length promises more bytes than the container holds.
    #[error("{stream} stream underflow: header declares {declared} bytes, {available} available")]
    Underflow {
        stream: Stream,
        declared: u64,
        available: u64,
    },

    /// The patch needs a codec this build does not provide.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl PatchError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Whether this is a `Corrupt` error.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}
