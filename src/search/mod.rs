// Diff search over a suffix-indexed old sequence.
//
// - `config` : SearchConfig profiles and level mapping
// - `engine` : compute_delta: the scan that emits instructions, diff and extra

pub mod config;
pub mod engine;

pub use config::{SearchConfig, config_for_level};
pub use engine::{Delta, compute_delta};
