//! Fixed-size bit set over state or row indices.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

const WORD_BITS: usize = 64;

/// A fixed-size set of indices backed by packed `u64` words.
///
/// Bits beyond `size` are always kept clear, so word-level operations
/// (union, intersection, complement) never leak phantom members.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitVector {
    words: Vec<u64>,
    size: usize,
}

impl BitVector {
    /// Create a bit vector of the given size with every bit set to `value`.
    pub fn new(size: usize, value: bool) -> Self {
        let fill = if value { u64::MAX } else { 0 };
        let mut bits = Self {
            words: vec![fill; size.div_ceil(WORD_BITS)],
            size,
        };
        bits.clear_tail();
        bits
    }

    /// Create a bit vector of the given size with exactly the listed bits set.
    ///
    /// Indices at or beyond `size` are ignored.
    pub fn from_indices(size: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::new(size, false);
        for index in indices {
            if index < size {
                bits.set(index, true);
            }
        }
        bits
    }

    /// Number of addressable bits.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the bit at `index`. Out-of-range indices read as unset.
    pub fn get(&self, index: usize) -> bool {
        if index >= self.size {
            return false;
        }
        self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Set the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= size`.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.size, "bit index {index} out of range for size {}", self.size);
        let mask = 1u64 << (index % WORD_BITS);
        if value {
            self.words[index / WORD_BITS] |= mask;
        } else {
            self.words[index / WORD_BITS] &= !mask;
        }
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Whether every bit is set.
    pub fn is_full(&self) -> bool {
        self.count_ones() == self.size
    }

    /// Number of set bits strictly before `index`.
    pub fn count_ones_before(&self, index: usize) -> usize {
        let index = index.min(self.size);
        let full_words = index / WORD_BITS;
        let mut count: usize = self.words[..full_words]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum();
        let rem = index % WORD_BITS;
        if rem != 0 {
            count += (self.words[full_words] & ((1u64 << rem) - 1)).count_ones() as usize;
        }
        count
    }

    /// Iterate over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            word_index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Prefix rank table: entry `i` holds the number of set bits before `i`.
    ///
    /// Only meaningful at set positions, where it yields the dense index of
    /// that member.
    pub fn rank_table(&self) -> Vec<usize> {
        let mut ranks = Vec::with_capacity(self.size);
        let mut seen = 0;
        for index in 0..self.size {
            ranks.push(seen);
            if self.get(index) {
                seen += 1;
            }
        }
        ranks
    }

    fn clear_tail(&mut self) {
        let rem = self.size % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    fn zip_words(&self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Self {
        let size = self.size.max(other.size);
        let len = size.div_ceil(WORD_BITS);
        let words = (0..len)
            .map(|i| {
                let a = self.words.get(i).copied().unwrap_or(0);
                let b = other.words.get(i).copied().unwrap_or(0);
                op(a, b)
            })
            .collect();
        let mut bits = Self { words, size };
        bits.clear_tail();
        bits
    }
}

impl BitOr for &BitVector {
    type Output = BitVector;

    fn bitor(self, rhs: &BitVector) -> BitVector {
        self.zip_words(rhs, |a, b| a | b)
    }
}

impl BitAnd for &BitVector {
    type Output = BitVector;

    fn bitand(self, rhs: &BitVector) -> BitVector {
        self.zip_words(rhs, |a, b| a & b)
    }
}

impl Not for &BitVector {
    type Output = BitVector;

    fn not(self) -> BitVector {
        let mut bits = BitVector {
            words: self.words.iter().map(|w| !w).collect(),
            size: self.size,
        };
        bits.clear_tail();
        bits
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector({}; ", self.size)?;
        f.debug_set().entries(self.iter_ones()).finish()?;
        write!(f, ")")
    }
}

/// Iterator over set bit indices.
pub struct Ones<'a> {
    words: &'a [u64],
    word_index: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_index * WORD_BITS + bit);
            }
            self.word_index += 1;
            self.current = *self.words.get(self.word_index)?;
        }
    }
}
