const WORD_BITS: usize = 64;

/// A set of row indices over a fixed universe `0..universe`, stored as packed
/// 64-bit words with a cached cardinality.
///
/// Candidate row sets, singleton columns and group masks all share this
/// representation; the discoverer's hot path is intersection plus count, so
/// both have allocation-free forms ([RowSet::intersect_into],
/// [RowSet::intersection_len]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowSet {
    words: Vec<u64>,
    universe: usize,
    len: usize,
}

impl RowSet {
    pub fn empty(universe: usize) -> Self {
        RowSet {
            words: vec![0; universe.div_ceil(WORD_BITS)],
            universe,
            len: 0,
        }
    }

    pub fn full(universe: usize) -> Self {
        let mut set = RowSet::empty(universe);
        for row in 0..universe {
            set.insert(row);
        }
        set
    }

    pub fn from_indices(universe: usize, rows: impl IntoIterator<Item = usize>) -> Self {
        let mut set = RowSet::empty(universe);
        for row in rows {
            set.insert(row);
        }
        set
    }

    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Number of rows in the set.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, row: usize) -> bool {
        if row >= self.universe {
            return false;
        }
        self.words[row / WORD_BITS] & (1u64 << (row % WORD_BITS)) != 0
    }

    /// Inserts `row`, returning whether it was newly added. Rows outside the
    /// universe are ignored.
    pub fn insert(&mut self, row: usize) -> bool {
        if row >= self.universe {
            return false;
        }
        let word = &mut self.words[row / WORD_BITS];
        let bit = 1u64 << (row % WORD_BITS);
        if *word & bit != 0 {
            return false;
        }
        *word |= bit;
        self.len += 1;
        true
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
        self.len = 0;
    }

    pub fn intersect_with(&mut self, other: &RowSet) {
        debug_assert_eq!(self.universe, other.universe);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= b;
        }
        self.recount();
    }

    /// Writes `self ∩ other` into `dst`, which must share the universe.
    pub fn intersect_into(&self, other: &RowSet, dst: &mut RowSet) {
        debug_assert_eq!(self.universe, other.universe);
        debug_assert_eq!(self.universe, dst.universe);
        let mut count = 0;
        for (d, (a, b)) in dst.words.iter_mut().zip(self.words.iter().zip(&other.words)) {
            *d = a & b;
            count += d.count_ones() as usize;
        }
        dst.len = count;
    }

    pub fn union_with(&mut self, other: &RowSet) {
        debug_assert_eq!(self.universe, other.universe);
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
        self.recount();
    }

    /// `|self ∩ other|` without materializing the intersection.
    pub fn intersection_len(&self, other: &RowSet) -> usize {
        debug_assert_eq!(self.universe, other.universe);
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let base = i * WORD_BITS;
            std::iter::successors(
                (word != 0).then_some(word),
                |w| {
                    let next = w & (w - 1);
                    (next != 0).then_some(next)
                },
            )
            .map(move |w| base + w.trailing_zeros() as usize)
        })
    }

    fn recount(&mut self) {
        self.len = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}
