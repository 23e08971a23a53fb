// Larsson-Sadakane suffix sorting (prefix doubling with ternary split).
//
// Sorts all suffixes of `old`, including the empty suffix at position
// `old.len()`, in O(n log n).  Two working arrays of `n + 1` entries are used:
//
//   - `sa`:   the suffix array being refined.  While sorting, a negative entry
//             `-k` marks a run of `k` already-sorted suffixes that can be
//             skipped in one step.
//   - `rank`: group number of each suffix (the index of the last slot of its
//             group in `sa`).  Once every group is a singleton this is the
//             inverse of the suffix array.
//
// Both arrays survive the sort, so the caller gets the suffix array and its
// rank (inverse) for free.

/// Below this group size the split uses the quadratic selection pass.
const SMALL_GROUP: usize = 16;

/// Sorted suffix array plus its inverse.
pub(crate) struct Sorted {
    pub sa: Vec<isize>,
    pub rank: Vec<isize>,
}

/// Build the suffix array of `old` (length `old.len() + 1`, slot 0 holds the
/// empty suffix) and its rank array.
pub(crate) fn qsufsort(old: &[u8]) -> Sorted {
    let n = old.len();
    let mut sa = vec![0isize; n + 1];
    let mut rank = vec![0isize; n + 1];

    // Bucket by first byte.
    let mut buckets = [0isize; 256];
    for &b in old {
        buckets[b as usize] += 1;
    }
    for i in 1..256 {
        buckets[i] += buckets[i - 1];
    }
    for i in (1..256).rev() {
        buckets[i] = buckets[i - 1];
    }
    buckets[0] = 0;

    for (i, &b) in old.iter().enumerate() {
        buckets[b as usize] += 1;
        sa[buckets[b as usize] as usize] = i as isize;
    }
    sa[0] = n as isize;
    for (i, &b) in old.iter().enumerate() {
        rank[i] = buckets[b as usize];
    }
    rank[n] = 0;

    for i in 1..256 {
        if buckets[i] == buckets[i - 1] + 1 {
            sa[buckets[i] as usize] = -1;
        }
    }
    sa[0] = -1;

    let total = n as isize + 1;
    let mut h = 1usize;
    while sa[0] != -total {
        let mut len: isize = 0;
        let mut i: isize = 0;
        while i < total {
            let v = sa[i as usize];
            if v < 0 {
                len -= v;
                i -= v;
            } else {
                if len != 0 {
                    sa[(i - len) as usize] = -len;
                }
                len = rank[v as usize] + 1 - i;
                split(&mut sa, &mut rank, i as usize, len as usize, h);
                i += len;
                len = 0;
            }
        }
        if len != 0 {
            sa[(i - len) as usize] = -len;
        }
        h += h;
    }

    for (i, &r) in rank.iter().enumerate() {
        sa[r as usize] = i as isize;
    }

    Sorted { sa, rank }
}

/// Key of suffix `s` at doubling depth `h`.
#[inline]
fn key(rank: &[isize], s: isize, h: usize) -> isize {
    rank[s as usize + h]
}

/// Refine the group `sa[start..start + len]` by the rank at offset `h`.
///
/// The right-hand remainder is handled iteratively so only the left
/// partition recurses.
fn split(sa: &mut [isize], rank: &mut [isize], mut start: usize, mut len: usize, h: usize) {
    loop {
        if len < SMALL_GROUP {
            split_small(sa, rank, start, len, h);
            return;
        }

        let x = key(rank, sa[start + len / 2], h);
        let mut jj = 0usize;
        let mut kk = 0usize;
        for &s in &sa[start..start + len] {
            let v = key(rank, s, h);
            if v < x {
                jj += 1;
            }
            if v == x {
                kk += 1;
            }
        }
        let jj = jj + start;
        let kk = kk + jj;

        // Three-way partition: [start, jj) < x, [jj, kk) == x, [kk, end) > x.
        let mut i = start;
        let mut j = 0usize;
        let mut k = 0usize;
        while i < jj {
            let v = key(rank, sa[i], h);
            if v < x {
                i += 1;
            } else if v == x {
                sa.swap(i, jj + j);
                j += 1;
            } else {
                sa.swap(i, kk + k);
                k += 1;
            }
        }
        while jj + j < kk {
            if key(rank, sa[jj + j], h) == x {
                j += 1;
            } else {
                sa.swap(jj + j, kk + k);
                k += 1;
            }
        }

        if jj > start {
            split(sa, rank, start, jj - start, h);
        }

        for idx in jj..kk {
            rank[sa[idx] as usize] = kk as isize - 1;
        }
        if jj == kk - 1 {
            sa[jj] = -1;
        }

        let end = start + len;
        if end <= kk {
            return;
        }
        start = kk;
        len = end - kk;
    }
}

/// Selection-sort style split for small groups: repeatedly pull the minimum
/// key to the front and close it off as its own group.
fn split_small(sa: &mut [isize], rank: &mut [isize], start: usize, len: usize, h: usize) {
    let end = start + len;
    let mut k = start;
    while k < end {
        let mut j = 1usize;
        let mut x = key(rank, sa[k], h);
        let mut i = 1usize;
        while k + i < end {
            let v = key(rank, sa[k + i], h);
            if v < x {
                x = v;
                j = 0;
            }
            if v == x {
                sa.swap(k + j, k + i);
                j += 1;
            }
            i += 1;
        }
        let group = (k + j) as isize - 1;
        for idx in k..k + j {
            rank[sa[idx] as usize] = group;
        }
        if j == 1 {
            sa[k] = -1;
        }
        k += j;
    }
}
