use crate::{Cell, Environment, Strategy};

const ADDRESS_BITS_PER_WORD: usize = 6;
const BITS_PER_WORD: usize = 1 << ADDRESS_BITS_PER_WORD;

#[inline(always)]
fn word_index(bit: usize) -> usize {
    bit >> ADDRESS_BITS_PER_WORD
}

#[inline(always)]
fn first_word_mask(from: usize) -> u64 {
    u64::MAX << (from % BITS_PER_WORD)
}

#[inline(always)]
fn last_word_mask(to: usize) -> u64 {
    u64::MAX >> (to.wrapping_neg() % BITS_PER_WORD)
}

/// Reversible set of naturals, stored as 64-bit words in long cells.
///
/// `words_in_use` counts the words up to the last non-zero one; every word
/// at or past it is zero. Words are added as bits past the capacity are set
/// and are never removed, but their contents are restored like any cell.
pub struct BitSet {
    words: Vec<Cell<i64>>,
    words_in_use: Cell<i32>,
}

impl BitSet {
    pub(crate) fn new<StrategyT: Strategy>(
        environment: &mut Environment<StrategyT>,
        number_of_bits: usize,
    ) -> Self {
        let words = (0..number_of_bits.div_ceil(BITS_PER_WORD))
            .map(|_| environment.make_long(0))
            .collect();
        Self {
            words,
            words_in_use: environment.make_int(0),
        }
    }

    /// Set holding `0..number_of_bits` from its creation on, so a pop past
    /// the world it was made in finds it full.
    pub(crate) fn new_full<StrategyT: Strategy>(
        environment: &mut Environment<StrategyT>,
        number_of_bits: usize,
    ) -> Self {
        let full = number_of_bits / BITS_PER_WORD;
        let words = (0..number_of_bits.div_ceil(BITS_PER_WORD))
            .map(|index| {
                let word = if index < full { u64::MAX } else { last_word_mask(number_of_bits) };
                environment.make_long(word as i64)
            })
            .collect();
        Self {
            words,
            words_in_use: environment.make_int(number_of_bits.div_ceil(BITS_PER_WORD) as i32),
        }
    }

    /// Number of bits that fit in the current words.
    pub fn capacity(&self) -> usize {
        return self.words.len() * BITS_PER_WORD;
    }

    #[inline(always)]
    fn word<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, index: usize) -> u64 {
        return self.words[index].get(environment) as u64;
    }

    #[inline(always)]
    fn set_word<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        index: usize,
        word: u64,
    ) {
        self.words[index].set(environment, word as i64);
    }

    #[inline(always)]
    fn in_use<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> usize {
        return self.words_in_use.get(environment) as usize;
    }

    fn ensure_capacity<StrategyT: Strategy>(
        &mut self,
        environment: &mut Environment<StrategyT>,
        words_required: usize,
    ) {
        if self.words.len() < words_required {
            let request = (2 * self.words.len()).max(words_required);
            while self.words.len() < request {
                self.words.push(environment.make_long(0));
            }
        }
    }

    fn expand_to<StrategyT: Strategy>(&mut self, environment: &mut Environment<StrategyT>, index: usize) {
        let words_required = index + 1;
        if self.in_use(environment) < words_required {
            self.ensure_capacity(environment, words_required);
            self.words_in_use.set(environment, words_required as i32);
        }
    }

    fn recalculate_words_in_use<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>) {
        let mut in_use = self.in_use(environment);
        while in_use > 0 && self.word(environment, in_use - 1) == 0 {
            in_use -= 1;
        }
        self.words_in_use.set(environment, in_use as i32);
    }

    #[cfg(debug_assertions)]
    fn check_invariants<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) {
        let in_use = self.in_use(environment);
        debug_assert!(in_use <= self.words.len());
        debug_assert!(in_use == 0 || self.word(environment, in_use - 1) != 0);
        debug_assert!((in_use..self.words.len()).all(|index| self.word(environment, index) == 0));
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn check_invariants<StrategyT: Strategy>(&self, _environment: &Environment<StrategyT>) {}

    pub fn get<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, bit: usize) -> bool {
        let index = word_index(bit);
        return index < self.in_use(environment)
            && self.word(environment, index) & (1u64 << (bit % BITS_PER_WORD)) != 0;
    }

    pub fn set<StrategyT: Strategy>(&mut self, environment: &mut Environment<StrategyT>, bit: usize) {
        let index = word_index(bit);
        self.expand_to(environment, index);
        let word = self.word(environment, index) | (1u64 << (bit % BITS_PER_WORD));
        self.set_word(environment, index, word);
        self.check_invariants(environment);
    }

    /// Sets the bits of `from..to`.
    pub fn set_range<StrategyT: Strategy>(
        &mut self,
        environment: &mut Environment<StrategyT>,
        from: usize,
        to: usize,
    ) {
        assert!(from <= to);
        if from == to {
            return;
        }
        let start = word_index(from);
        let end = word_index(to - 1);
        self.expand_to(environment, end);

        let (first_mask, last_mask) = (first_word_mask(from), last_word_mask(to));
        if start == end {
            let word = self.word(environment, start) | (first_mask & last_mask);
            self.set_word(environment, start, word);
        } else {
            let word = self.word(environment, start) | first_mask;
            self.set_word(environment, start, word);
            for index in start + 1..end {
                self.set_word(environment, index, u64::MAX);
            }
            let word = self.word(environment, end) | last_mask;
            self.set_word(environment, end, word);
        }
        self.check_invariants(environment);
    }

    pub fn clear<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>, bit: usize) {
        let index = word_index(bit);
        if index >= self.in_use(environment) {
            return;
        }
        let word = self.word(environment, index) & !(1u64 << (bit % BITS_PER_WORD));
        self.set_word(environment, index, word);
        self.recalculate_words_in_use(environment);
        self.check_invariants(environment);
    }

    /// Clears the bits of `from..to`.
    pub fn clear_range<StrategyT: Strategy>(
        &self,
        environment: &mut Environment<StrategyT>,
        from: usize,
        mut to: usize,
    ) {
        assert!(from <= to);
        if from == to {
            return;
        }
        let in_use = self.in_use(environment);
        let start = word_index(from);
        if start >= in_use {
            return;
        }
        let mut end = word_index(to - 1);
        if end >= in_use {
            to = self.length(environment);
            end = in_use - 1;
        }

        let (first_mask, last_mask) = (first_word_mask(from), last_word_mask(to));
        if start == end {
            let word = self.word(environment, start) & !(first_mask & last_mask);
            self.set_word(environment, start, word);
        } else {
            let word = self.word(environment, start) & !first_mask;
            self.set_word(environment, start, word);
            for index in start + 1..end {
                self.set_word(environment, index, 0);
            }
            let word = self.word(environment, end) & !last_mask;
            self.set_word(environment, end, word);
        }
        self.recalculate_words_in_use(environment);
        self.check_invariants(environment);
    }

    pub fn clear_all<StrategyT: Strategy>(&self, environment: &mut Environment<StrategyT>) {
        for word in self.words.iter() {
            word.set(environment, 0);
        }
        self.words_in_use.set(environment, 0);
    }

    /// One past the highest set bit, or zero.
    pub fn length<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> usize {
        let in_use = self.in_use(environment);
        if in_use == 0 {
            return 0;
        }
        let last = self.word(environment, in_use - 1);
        return BITS_PER_WORD * (in_use - 1) + (BITS_PER_WORD - last.leading_zeros() as usize);
    }

    pub fn is_empty<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> bool {
        return self.in_use(environment) == 0;
    }

    pub fn cardinality<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>) -> usize {
        return (0..self.in_use(environment))
            .map(|index| self.word(environment, index).count_ones() as usize)
            .sum();
    }

    pub fn next_set_bit<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        from: usize,
    ) -> Option<usize> {
        let in_use = self.in_use(environment);
        let mut index = word_index(from);
        if index >= in_use {
            return None;
        }
        let mut word = self.word(environment, index) & first_word_mask(from);
        loop {
            if word != 0 {
                return Some(index * BITS_PER_WORD + word.trailing_zeros() as usize);
            }
            index += 1;
            if index == in_use {
                return None;
            }
            word = self.word(environment, index);
        }
    }

    pub fn next_clear_bit<StrategyT: Strategy>(&self, environment: &Environment<StrategyT>, from: usize) -> usize {
        let in_use = self.in_use(environment);
        let mut index = word_index(from);
        if index >= in_use {
            return from;
        }
        let mut word = !self.word(environment, index) & first_word_mask(from);
        loop {
            if word != 0 {
                return index * BITS_PER_WORD + word.trailing_zeros() as usize;
            }
            index += 1;
            if index == in_use {
                return in_use * BITS_PER_WORD;
            }
            word = !self.word(environment, index);
        }
    }

    pub fn prev_set_bit<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        from: usize,
    ) -> Option<usize> {
        let mut index = word_index(from);
        if index >= self.in_use(environment) {
            return self.length(environment).checked_sub(1);
        }
        let mut word = self.word(environment, index) & last_word_mask(from + 1);
        loop {
            if word != 0 {
                return Some((index + 1) * BITS_PER_WORD - 1 - word.leading_zeros() as usize);
            }
            if index == 0 {
                return None;
            }
            index -= 1;
            word = self.word(environment, index);
        }
    }

    pub fn prev_clear_bit<StrategyT: Strategy>(
        &self,
        environment: &Environment<StrategyT>,
        from: usize,
    ) -> Option<usize> {
        let mut index = word_index(from);
        if index >= self.in_use(environment) {
            return Some(from);
        }
        let mut word = !self.word(environment, index) & last_word_mask(from + 1);
        loop {
            if word != 0 {
                return Some((index + 1) * BITS_PER_WORD - 1 - word.leading_zeros() as usize);
            }
            if index == 0 {
                return None;
            }
            index -= 1;
            word = !self.word(environment, index);
        }
    }

    /// Set bits in increasing order.
    pub fn iter<'a, StrategyT: Strategy>(
        &'a self,
        environment: &'a Environment<StrategyT>,
    ) -> impl Iterator<Item = usize> + 'a {
        return std::iter::successors(self.next_set_bit(environment, 0), move |&bit| {
            self.next_set_bit(environment, bit + 1)
        });
    }
}
