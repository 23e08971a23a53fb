// Suffix index over the old sequence.
//
// Answers "longest prefix of this new-side tail that occurs anywhere in old"
// by binary search over the suffix array, then applies a locality bias when
// several old offsets share the same best length.

use log::trace;

use super::qsufsort::{self, Sorted};

/// A longest-match query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Offset into old where the match starts.
    pub pos: usize,
    /// Number of bytes matched.
    pub len: usize,
}

/// Suffix array of the old sequence plus its rank (inverse) array.
///
/// Built once per old sequence and reusable for any number of diffs against
/// it. The index does not own `old`; every query takes the same slice the
/// index was built from.
#[derive(Debug, Clone)]
pub struct SuffixIndex {
    sa: Vec<isize>,
    rank: Vec<isize>,
}

impl SuffixIndex {
    /// Sort every suffix of `old`. Never fails; empty input is legal.
    pub fn build(old: &[u8]) -> Self {
        let Sorted { sa, rank } = qsufsort::qsufsort(old);
        trace!("suffix index built over {} bytes", old.len());
        Self { sa, rank }
    }

    /// Length of the indexed sequence.
    pub fn len(&self) -> usize {
        self.sa.len() - 1
    }

    /// Whether the indexed sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Suffix-array slot `i` (slot 0 is the empty suffix).
    pub fn suffix_at(&self, i: usize) -> usize {
        self.sa[i] as usize
    }

    /// Position of the suffix starting at `pos` within the suffix array.
    pub fn rank_of(&self, pos: usize) -> usize {
        self.rank[pos] as usize
    }

    /// Find the longest prefix of `tail` occurring in `old`.
    ///
    /// When several old offsets give the same length, the one closest to
    /// `expected` wins. `expected` itself is tried first; otherwise up to
    /// `tie_candidates` suffix-array neighbours on each side of the search
    /// hit are compared.
    pub fn longest_match(
        &self,
        old: &[u8],
        tail: &[u8],
        expected: usize,
        tie_candidates: usize,
    ) -> Match {
        debug_assert_eq!(old.len(), self.len());

        let (slot, len) = self.search(old, tail);
        let pos = self.suffix_at(slot);
        if len == 0 {
            return Match { pos, len };
        }

        if expected < old.len() && expected != pos {
            let here = matchlen(&old[expected..], tail);
            if here == len {
                return Match { pos: expected, len };
            }
        }

        if tie_candidates == 0 || pos == expected {
            return Match { pos, len };
        }

        let mut best = pos;
        let mut best_dist = pos.abs_diff(expected);

        // Suffixes sharing the best prefix form a contiguous run in the
        // suffix array around `slot`.
        let mut lo = slot;
        for _ in 0..tie_candidates {
            if lo == 0 {
                break;
            }
            lo -= 1;
            let cand = self.suffix_at(lo);
            if matchlen(&old[cand..], tail) < len {
                break;
            }
            let dist = cand.abs_diff(expected);
            if dist < best_dist {
                best = cand;
                best_dist = dist;
            }
        }

        let mut hi = slot;
        for _ in 0..tie_candidates {
            if hi + 1 >= self.sa.len() {
                break;
            }
            hi += 1;
            let cand = self.suffix_at(hi);
            if matchlen(&old[cand..], tail) < len {
                break;
            }
            let dist = cand.abs_diff(expected);
            if dist < best_dist {
                best = cand;
                best_dist = dist;
            }
        }

        Match { pos: best, len }
    }

    /// Binary search for the insertion point of `tail` among the sorted
    /// suffixes. The longest common prefix is held by one of the two
    /// neighbours of that point; returns its slot and match length.
    fn search(&self, old: &[u8], tail: &[u8]) -> (usize, usize) {
        let mut st = 0usize;
        let mut en = self.sa.len() - 1;

        // Invariant: suffix(st) < tail (slot 0 is the empty suffix).
        while en - st >= 2 {
            let mid = st + (en - st) / 2;
            if old[self.suffix_at(mid)..] < *tail {
                st = mid;
            } else {
                en = mid;
            }
        }

        let x = matchlen(&old[self.suffix_at(st)..], tail);
        let y = matchlen(&old[self.suffix_at(en)..], tail);
        if x > y { (st, x) } else { (en, y) }
    }
}

/// Number of leading bytes shared by `a` and `b`.
#[inline]
pub fn matchlen(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
