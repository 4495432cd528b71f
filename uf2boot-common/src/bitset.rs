// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Fixed-capacity bitset over caller-provided word storage.

/// Read bit `index` of `words` through a shared borrow. Out-of-range bits
/// read as clear.
pub fn test_bit(words: &[u32], index: u32) -> bool {
    words
        .get((index / 32) as usize)
        .is_some_and(|word| word & (1 << (index % 32)) != 0)
}

pub struct BitSet<'a> {
    words: &'a mut [u32],
}

impl<'a> BitSet<'a> {
    pub fn new(words: &'a mut [u32]) -> Self {
        Self { words }
    }

    /// Number of bits the storage can hold.
    pub fn capacity(&self) -> u32 {
        (self.words.len() * 32) as u32
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn contains(&self, index: u32) -> bool {
        test_bit(self.words, index)
    }

    /// Set bit `index`. Returns true if it was previously clear; false if
    /// it was already set or is out of range.
    pub fn insert(&mut self, index: u32) -> bool {
        let Some(word) = self.words.get_mut((index / 32) as usize) else {
            return false;
        };
        let mask = 1 << (index % 32);
        let was_clear = *word & mask == 0;
        *word |= mask;
        was_clear
    }
}
