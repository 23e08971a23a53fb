// Diff search: turns (old, new) into copy/insert/seek instructions plus the
// diff and extra byte streams.
//
// The scan walks `new` left to right.  At each position it asks the suffix
// index for the longest exact match in old and compares it with how many of
// those bytes the current alignment (`scan + last_offset`) already explains.
// A match is settled once it clearly beats the current alignment; the bytes
// between the previous match and the new one are then split three ways:
//
//   [last_scan, last_scan + len_f)   forward extension of the previous match
//   [.., scan - len_b)               unmatched bytes, copied to extra
//   [scan - len_b, scan)             backward extension of the new match
//
// Extensions are approximate: they tolerate mismatching bytes as long as the
// match ratio stays above the configured threshold, which is what keeps runs
// of small edits inside one diff region.

use log::debug;

use super::config::SearchConfig;
use crate::format::Instruction;
use crate::suffix::SuffixIndex;

/// Output of the search: everything the encoder needs besides the new size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Instructions in replay order.
    pub instructions: Vec<Instruction>,
    /// `new - old` for every copied byte (wrapping).
    pub diff: Vec<u8>,
    /// Literal bytes for every inserted region.
    pub extra: Vec<u8>,
}

impl Delta {
    /// Number of bytes the instructions reconstruct.
    pub fn output_len(&self) -> u64 {
        self.instructions.iter().map(Instruction::output_len).sum()
    }
}

/// Whether `new[at]` lines up with its old counterpart under `offset`.
#[inline]
fn aligned(old: &[u8], new: &[u8], at: usize, offset: i64) -> bool {
    let o = at as i64 + offset;
    o >= 0 && (o as usize) < old.len() && old[o as usize] == new[at]
}

/// Compute the instruction stream that rebuilds `new` from `old`.
///
/// `index` must have been built from `old`. Never fails; callers are expected
/// to keep both inputs within `i32::MAX` bytes so every length and seek fits
/// the control triple.
pub fn compute_delta(
    old: &[u8],
    new: &[u8],
    index: &SuffixIndex,
    config: &SearchConfig,
) -> Delta {
    debug_assert_eq!(index.len(), old.len());

    let old_len = old.len();
    let new_len = new.len();
    let weight = config.extension_weight;

    let mut delta = Delta {
        instructions: Vec::new(),
        diff: Vec::with_capacity(new_len),
        extra: Vec::new(),
    };

    let mut scan = 0usize;
    let mut len = 0usize;
    let mut pos = 0usize;
    let mut last_scan = 0usize;
    let mut last_pos = 0usize;
    let mut last_offset = 0i64;

    while scan < new_len {
        let mut old_score = 0i64;
        scan += len;
        let mut scsc = scan;

        while scan < new_len {
            let expected = (scan as i64 + last_offset).clamp(0, old_len as i64) as usize;
            let m = index.longest_match(old, &new[scan..], expected, config.tie_candidates);
            pos = m.pos;
            len = m.len;

            while scsc < scan + len {
                if aligned(old, new, scsc, last_offset) {
                    old_score += 1;
                }
                scsc += 1;
            }

            let len_i = len as i64;
            if (len_i == old_score && len != 0) || len_i > old_score + config.min_gain as i64 {
                break;
            }

            if aligned(old, new, scan, last_offset) {
                old_score -= 1;
            }
            scan += 1;
        }

        if len as i64 == old_score && scan != new_len {
            continue;
        }

        // Forward extension from the end of the previous match.
        let mut len_f = 0usize;
        {
            let mut s = 0i64;
            let mut best = 0i64;
            let mut i = 0usize;
            while last_scan + i < scan && last_pos + i < old_len {
                if old[last_pos + i] == new[last_scan + i] {
                    s += 1;
                }
                i += 1;
                let score = s * weight - i as i64;
                if score > best {
                    best = score;
                    len_f = i;
                }
            }
        }

        // Backward extension from the start of the new match.
        let mut len_b = 0usize;
        if scan < new_len {
            let mut s = 0i64;
            let mut best = 0i64;
            let mut i = 1usize;
            while scan >= last_scan + i && pos >= i {
                if old[pos - i] == new[scan - i] {
                    s += 1;
                }
                let score = s * weight - i as i64;
                if score > best {
                    best = score;
                    len_b = i;
                }
                i += 1;
            }
        }

        // The two extensions may claim the same bytes; cut where the forward
        // side stops explaining more than the backward side.
        if last_scan + len_f > scan - len_b {
            let overlap = (last_scan + len_f) - (scan - len_b);
            let mut s = 0i64;
            let mut best = 0i64;
            let mut len_s = 0usize;
            for i in 0..overlap {
                if new[last_scan + len_f - overlap + i] == old[last_pos + len_f - overlap + i] {
                    s += 1;
                }
                if new[scan - len_b + i] == old[pos - len_b + i] {
                    s -= 1;
                }
                if s > best {
                    best = s;
                    len_s = i + 1;
                }
            }
            len_f = len_f + len_s - overlap;
            len_b -= len_s;
        }

        delta.diff.extend(
            new[last_scan..last_scan + len_f]
                .iter()
                .zip(&old[last_pos..last_pos + len_f])
                .map(|(n, o)| n.wrapping_sub(*o)),
        );

        let insert_start = last_scan + len_f;
        let insert_end = scan - len_b;
        delta.extra.extend_from_slice(&new[insert_start..insert_end]);

        let seek = (pos as i64 - len_b as i64) - (last_pos as i64 + len_f as i64);
        let output = len_f + (insert_end - insert_start);
        match delta.instructions.last_mut() {
            // An empty triple only moves the old cursor; fold it into the
            // previous seek so the control stream stays within one triple
            // per output byte.
            Some(prev) if output == 0 => prev.seek = (prev.seek as i64 + seek) as i32,
            _ => delta.instructions.push(Instruction::new(
                len_f as u32,
                (insert_end - insert_start) as u32,
                seek as i32,
            )),
        }

        last_scan = scan - len_b;
        last_pos = pos - len_b;
        last_offset = pos as i64 - scan as i64;
    }

    debug!(
        "search ({}): {} instructions, {} diff bytes, {} extra bytes",
        config.name,
        delta.instructions.len(),
        delta.diff.len(),
        delta.extra.len()
    );

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::decoder::replay;
    use crate::search::config::{FAST, THOROUGH};

    fn delta_for(old: &[u8], new: &[u8]) -> Delta {
        let index = SuffixIndex::build(old);
        compute_delta(old, new, &index, &SearchConfig::default())
    }

    fn rebuild(old: &[u8], delta: &Delta) -> Vec<u8> {
        replay(
            old,
            delta.instructions.iter().copied().map(Ok),
            &delta.diff,
            &delta.extra,
            delta.output_len(),
            true,
        )
        .unwrap()
    }

    #[test]
    fn single_substitution() {
        let old = b"abcabc";
        let new = b"abcXbc";
        let delta = delta_for(old, new);
        assert_eq!(delta.instructions.len(), 1);
        assert_eq!(delta.instructions[0].copy_len, 6);
        assert_eq!(delta.instructions[0].insert_len, 0);
        assert_eq!(delta.diff, vec![0, 0, 0, b'X'.wrapping_sub(b'a'), 0, 0]);
        assert!(delta.extra.is_empty());
        assert_eq!(rebuild(old, &delta), new);
    }

    #[test]
    fn identical_inputs_give_zero_diff() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let delta = delta_for(&data, &data);
        assert!(delta.extra.is_empty());
        assert_eq!(delta.diff.len(), data.len());
        assert!(delta.diff.iter().all(|&b| b == 0));
        assert_eq!(rebuild(&data, &delta), data);
    }

    #[test]
    fn empty_old_is_one_insert() {
        let delta = delta_for(b"", b"brand new content");
        assert_eq!(delta.instructions, vec![Instruction::new(0, 17, 0)]);
        assert_eq!(delta.extra, b"brand new content");
        assert!(delta.diff.is_empty());
    }

    #[test]
    fn empty_new_has_no_instructions() {
        let delta = delta_for(b"old data", b"");
        assert!(delta.instructions.is_empty());
        assert!(delta.diff.is_empty());
        assert!(delta.extra.is_empty());
        assert_eq!(delta.output_len(), 0);
    }

    #[test]
    fn both_empty() {
        assert_eq!(delta_for(b"", b""), Delta::default());
    }

    #[test]
    fn unrelated_bytes_go_to_extra() {
        let old = vec![0x11u8; 64];
        let new: Vec<u8> = (0..64u8).map(|i| 0x80 | i).collect();
        let delta = delta_for(&old, &new);
        assert_eq!(delta.extra, new);
        assert_eq!(rebuild(&old, &delta), new);
    }

    #[test]
    fn insertion_in_the_middle() {
        let old: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut new = old[..2000].to_vec();
        new.extend_from_slice(b"<<< inserted block of text that is not in old >>>");
        new.extend_from_slice(&old[2000..]);

        let delta = delta_for(&old, &new);
        assert_eq!(delta.output_len(), new.len() as u64);
        assert!(delta.extra.len() < 200, "extra = {}", delta.extra.len());
        assert_eq!(rebuild(&old, &delta), new);
    }

    #[test]
    fn moved_blocks_use_negative_seek() {
        let a: Vec<u8> = (0..1000u32).map(|i| (i * 13 % 253) as u8).collect();
        let b: Vec<u8> = (0..1000u32).map(|i| (i * 17 % 241) as u8 ^ 0x5A).collect();
        let old = [a.clone(), b.clone()].concat();
        let new = [b, a].concat();

        let delta = delta_for(&old, &new);
        assert!(delta.instructions.iter().any(|i| i.seek < 0));
        assert_eq!(rebuild(&old, &delta), new);
    }

    #[test]
    fn only_the_first_instruction_may_be_empty() {
        let a: Vec<u8> = (0..1000u32).map(|i| (i * 13 % 253) as u8).collect();
        let b: Vec<u8> = (0..1000u32).map(|i| (i * 17 % 241) as u8 ^ 0x5A).collect();
        let c: Vec<u8> = (0..700u32).map(|i| (i * 29 % 239) as u8 ^ 0xC3).collect();
        let old = [a.clone(), b.clone(), c.clone()].concat();
        let new = [c, b.clone(), a, b].concat();

        let delta = delta_for(&old, &new);
        // new opens with a match far into old, so the first triple is a bare seek.
        assert_eq!(delta.instructions[0].output_len(), 0);
        assert!(delta.instructions[1..].iter().all(|i| i.output_len() > 0));
        assert!(delta.instructions.len() as u64 <= new.len() as u64 + 1);
        assert_eq!(rebuild(&old, &delta), new);
    }

    #[test]
    fn scattered_edits_stay_in_diff() {
        let mut seed = 7u64;
        let old: Vec<u8> = (0..20_000)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                (seed >> 33) as u8
            })
            .collect();
        let mut new = old.clone();
        for i in (0..new.len()).step_by(97) {
            new[i] = new[i].wrapping_add(1);
        }

        let delta = delta_for(&old, &new);
        assert!(delta.extra.len() < new.len() / 50, "extra = {}", delta.extra.len());
        let nonzero = delta.diff.iter().filter(|&&b| b != 0).count();
        assert!(nonzero <= new.len() / 97 + 1);
        assert_eq!(rebuild(&old, &delta), new);
    }

    #[test]
    fn profiles_all_reconstruct() {
        let old: Vec<u8> = b"header v1 ".iter().copied().cycle().take(3000).collect();
        let mut new = old.clone();
        new[100..110].copy_from_slice(b"header v2 ");
        new.truncate(2500);
        new.extend_from_slice(b"trailer");

        let index = SuffixIndex::build(&old);
        for config in [FAST, SearchConfig::default(), THOROUGH] {
            let delta = compute_delta(&old, &new, &index, &config);
            assert_eq!(rebuild(&old, &delta), new, "profile {}", config.name);
        }
    }

    #[test]
    fn old_shorter_than_new() {
        let old = b"short";
        let new = b"short but followed by a lot more text";
        let delta = delta_for(old, new);
        assert_eq!(delta.diff.len() + delta.extra.len(), new.len());
        assert_eq!(rebuild(old, &delta), new);
    }
}
