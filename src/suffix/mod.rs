// Suffix sorting and longest-match lookup over the old sequence.
//
// - `qsufsort` : Larsson-Sadakane suffix array construction
// - `index`    : SuffixIndex: suffix array + rank, longest-match queries

mod qsufsort;

pub mod index;

pub use index::{Match, SuffixIndex, matchlen};
