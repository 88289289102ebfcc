//! Symmetric bit matrix over region ids.

/// Bit-packed symmetric relation: setting `(a, b)` also sets `(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMatrix {
    size: usize,
    data: Vec<u32>,
}

impl PairMatrix {
    /// Creates an empty relation over ids `0..size`.
    pub fn new(size: usize) -> Self {
        let words_needed = (size * size).div_ceil(32);
        Self {
            size,
            data: vec![0; words_needed],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn bit(&self, a: usize, b: usize) -> (usize, u32) {
        debug_assert!(a < self.size && b < self.size, "Pair ({a}, {b}) out of range");
        let bit_index = a * self.size + b;
        (bit_index / 32, 1u32 << (bit_index % 32))
    }

    #[inline]
    pub fn get(&self, a: usize, b: usize) -> bool {
        let (word, mask) = self.bit(a, b);
        self.data[word] & mask != 0
    }

    /// Marks the pair in both directions. Returns `true` if it was not set.
    pub fn set(&mut self, a: usize, b: usize) -> bool {
        let was_set = self.get(a, b);
        for (from, to) in [(a, b), (b, a)] {
            let (word, mask) = self.bit(from, to);
            self.data[word] |= mask;
        }
        !was_set
    }

    /// Ids related to `a`, ascending.
    pub fn row(&self, a: usize) -> Vec<usize> {
        (0..self.size).filter(|&b| self.get(a, b)).collect()
    }

    /// Number of unordered pairs set, self-pairs included once.
    pub fn count_pairs(&self) -> usize {
        (0..self.size)
            .map(|a| (a..self.size).filter(|&b| self.get(a, b)).count())
            .sum()
    }

    /// Returns memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.data.len() * std::mem::size_of::<u32>()
    }
}
