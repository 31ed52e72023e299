//! Fixed-width bitmap of processing unit (or NUMA node) indices.
//!
//! Every locality computation reduces to set algebra on these bitmaps: an
//! object's cpuset is the set of processing units it physically contains.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use itertools::Itertools;

use crate::domain::error::{DomainError, DomainResult};

/// Number of indices a [`CpuSet`] can hold; valid indices are `0..MAX_INDEX`.
pub const MAX_INDEX: usize = 1024;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = MAX_INDEX / WORD_BITS;

/// Ordered set of indices in `[0, MAX_INDEX)`.
///
/// Pure operations (`union`, `intersect`, the `|` and `&` operators) return
/// new values; mutators (`set`, `clear`, `union_with`, ...) act in place.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CpuSet {
    words: [u64; WORDS],
}

/// Set of NUMA node indices. Same representation as a [`CpuSet`].
pub type NodeSet = CpuSet;

impl Default for CpuSet {
    fn default() -> Self {
        Self::zero()
    }
}

fn check_index(index: usize) -> DomainResult<()> {
    if index >= MAX_INDEX {
        return Err(DomainError::IndexOutOfRange {
            index,
            max: MAX_INDEX,
        });
    }
    Ok(())
}

impl CpuSet {
    /// The empty set.
    pub fn zero() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Every index in `[0, MAX_INDEX)`.
    pub fn full() -> Self {
        Self {
            words: [u64::MAX; WORDS],
        }
    }

    pub fn singleton(index: usize) -> DomainResult<Self> {
        let mut set = Self::zero();
        set.set(index)?;
        Ok(set)
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> DomainResult<Self> {
        let mut set = Self::zero();
        for index in indices {
            set.set(index)?;
        }
        Ok(set)
    }

    pub fn set(&mut self, index: usize) -> DomainResult<()> {
        check_index(index)?;
        self.words[index / WORD_BITS] |= 1u64 << (index % WORD_BITS);
        Ok(())
    }

    pub fn clear(&mut self, index: usize) -> DomainResult<()> {
        check_index(index)?;
        self.words[index / WORD_BITS] &= !(1u64 << (index % WORD_BITS));
        Ok(())
    }

    pub fn is_set(&self, index: usize) -> DomainResult<bool> {
        check_index(index)?;
        Ok(self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// Empties the set in place.
    pub fn reset(&mut self) {
        self.words = [0; WORDS];
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn is_equal(&self, other: &Self) -> bool {
        self == other
    }

    /// Cardinality.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }

    pub fn union_with(&mut self, other: &Self) {
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
    }

    pub fn intersect_with(&mut self, other: &Self) {
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= o;
        }
    }

    /// Indices of `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (w, o) in result.words.iter_mut().zip(other.words.iter()) {
            *w &= !o;
        }
        result
    }

    /// True if every index of `inner` is also in `self`.
    pub fn includes(&self, inner: &Self) -> bool {
        self.words
            .iter()
            .zip(inner.words.iter())
            .all(|(w, i)| i & !w == 0)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(w, o)| w & o != 0)
    }

    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize))
    }

    /// Ascending iterator over the indices in the set.
    ///
    /// The iterator borrows the set; calling `iter()` again restarts from the
    /// lowest index.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            word: 0,
            pending: self.words[0],
        }
    }

    /// Compact list form, e.g. `0-3,8`. The empty set renders as an empty string.
    pub fn to_list_string(&self) -> String {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for index in self.iter() {
            match ranges.last_mut() {
                Some((_, end)) if *end + 1 == index => *end = index,
                _ => ranges.push((index, index)),
            }
        }
        ranges
            .into_iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{}-{}", start, end)
                }
            })
            .join(",")
    }

    /// Parses the list form produced by [`CpuSet::to_list_string`].
    pub fn parse_list(s: &str) -> DomainResult<Self> {
        let mut set = Self::zero();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (start, end) = match part.split_once('-') {
                Some((a, b)) => (parse_index(s, a)?, parse_index(s, b)?),
                None => {
                    let i = parse_index(s, part)?;
                    (i, i)
                }
            };
            for index in start..=end {
                set.set(index)?;
            }
        }
        Ok(set)
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Builds a set from raw 64-bit words; words past the capacity are ignored.
    pub(crate) fn from_words(words: &[u64]) -> Self {
        let mut set = Self::zero();
        for (dst, src) in set.words.iter_mut().zip(words) {
            *dst = *src;
        }
        set
    }
}

fn parse_index(list: &str, s: &str) -> DomainResult<usize> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| DomainError::cpuset(list, format!("{:?} is not an index", s.trim())))
}

/// Iterator returned by [`CpuSet::iter`].
pub struct Iter<'a> {
    set: &'a CpuSet,
    word: usize,
    pending: u64,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.pending != 0 {
                let bit = self.pending.trailing_zeros() as usize;
                self.pending &= self.pending - 1;
                return Some(self.word * WORD_BITS + bit);
            }
            self.word += 1;
            if self.word >= WORDS {
                return None;
            }
            self.pending = self.set.words[self.word];
        }
    }
}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a CpuSet {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl BitOr<&CpuSet> for &CpuSet {
    type Output = CpuSet;

    fn bitor(self, rhs: &CpuSet) -> CpuSet {
        self.union(rhs)
    }
}

impl BitAnd<&CpuSet> for &CpuSet {
    type Output = CpuSet;

    fn bitand(self, rhs: &CpuSet) -> CpuSet {
        self.intersect(rhs)
    }
}

/// Hexadecimal form: comma-separated 32-bit groups, most significant first,
/// e.g. `0x0000000f` or `0x00000001,0x00000000`. The empty set is `0x0`.
impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<u32> = self
            .words
            .iter()
            .flat_map(|&w| [w as u32, (w >> 32) as u32])
            .collect();
        match groups.iter().rposition(|&g| g != 0) {
            None => write!(f, "0x0"),
            Some(top) => {
                let rendered = groups[..=top]
                    .iter()
                    .rev()
                    .map(|g| format!("0x{:08x}", g))
                    .join(",");
                write!(f, "{}", rendered)
            }
        }
    }
}

impl fmt::Debug for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CpuSet({})", self.to_list_string())
    }
}

impl FromStr for CpuSet {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        let invalid = || DomainError::cpuset(s, "expected comma-separated 0x groups");
        let groups: Vec<&str> = s.trim().split(',').collect();
        let mut set = Self::zero();
        for (position, group) in groups.iter().rev().enumerate() {
            let digits = group
                .trim()
                .strip_prefix("0x")
                .ok_or_else(invalid)?;
            let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
            for bit in 0..32 {
                if value & (1 << bit) != 0 {
                    set.set(position * 32 + bit)?;
                }
            }
        }
        Ok(set)
    }
}
