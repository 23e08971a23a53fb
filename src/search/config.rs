// Search profiles for the diff engine.
//
// Every threshold the search uses lives here and is passed explicitly, so the
// engine itself holds no state between runs.

/// Tuning parameters for `compute_delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Name for display purposes.
    pub name: &'static str,
    /// A fresh suffix-array match replaces the current alignment only when it
    /// is longer than the bytes the current alignment already explains by
    /// more than this many bytes.
    pub min_gain: usize,
    /// Approximate extension keeps the prefix maximising
    /// `extension_weight * matching_bytes - length`; with a weight of 2 a
    /// region is kept while more than half of its bytes match.
    pub extension_weight: i64,
    /// Suffix-array neighbours inspected on each side when breaking ties
    /// between equally long matches (0 = take the first one found).
    pub tie_candidates: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        DEFAULT
    }
}

/// Map a level (0-9) to a profile.
///
/// - Levels 0-3: fast
/// - Levels 4-6: default
/// - Levels 7-9: thorough
pub fn config_for_level(level: u32) -> SearchConfig {
    match level {
        0..=3 => FAST,
        4..=6 => DEFAULT,
        _ => THOROUGH,
    }
}

// ---------------------------------------------------------------------------
// Profile definitions
// ---------------------------------------------------------------------------

pub const FAST: SearchConfig = SearchConfig {
    name: "fast",
    min_gain: 8,
    extension_weight: 2,
    tie_candidates: 0,
};

pub const DEFAULT: SearchConfig = SearchConfig {
    name: "default",
    min_gain: 8,
    extension_weight: 2,
    tie_candidates: 16,
};

pub const THOROUGH: SearchConfig = SearchConfig {
    name: "thorough",
    min_gain: 8,
    extension_weight: 2,
    tie_candidates: 256,
};
