use smallvec::SmallVec;

/// A column (singleton) identifier.
pub type Item = u32;

/// A sorted, duplicate-free set of column ids.
///
/// Itemsets stay short in practice, so the backing store is inline up to
/// eight items. Ordering is lexicographic on the sorted contents, which is
/// the deterministic tie-break used throughout the discoverer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSet(SmallVec<[Item; 8]>);

impl ItemSet {
    pub fn new() -> Self {
        ItemSet(SmallVec::new())
    }

    pub fn singleton(item: Item) -> Self {
        let mut items = SmallVec::new();
        items.push(item);
        ItemSet(items)
    }

    /// Builds from a slice that is already sorted and duplicate-free.
    pub fn from_sorted(items: &[Item]) -> Self {
        debug_assert!(items.windows(2).all(|w| w[0] < w[1]));
        ItemSet(SmallVec::from_slice(items))
    }

    pub fn from_unsorted(items: impl IntoIterator<Item = Item>) -> Self {
        let mut v: SmallVec<[Item; 8]> = items.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        ItemSet(v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Item> + '_ {
        self.0.iter().copied()
    }

    pub fn last(&self) -> Option<Item> {
        self.0.last().copied()
    }

    pub fn contains(&self, item: Item) -> bool {
        self.0.binary_search(&item).is_ok()
    }

    /// Position of `item` within the sorted contents.
    pub fn position(&self, item: Item) -> Option<usize> {
        self.0.binary_search(&item).ok()
    }

    pub fn is_subset_of(&self, other: &ItemSet) -> bool {
        let mut rhs = other.0.iter();
        'outer: for item in &self.0 {
            for candidate in rhs.by_ref() {
                if candidate == item {
                    continue 'outer;
                }
                if candidate > item {
                    return false;
                }
            }
            return false;
        }
        true
    }

    /// Canonical lattice extension: appends an item strictly greater than
    /// everything already present.
    pub fn extended(&self, item: Item) -> ItemSet {
        debug_assert!(self.last().is_none_or(|last| item > last));
        let mut items = self.0.clone();
        items.push(item);
        ItemSet(items)
    }

    pub fn union(&self, other: &ItemSet) -> ItemSet {
        let mut out: SmallVec<[Item; 8]> = SmallVec::with_capacity(self.len() + other.len());
        let (mut a, mut b) = (self.0.iter().peekable(), other.0.iter().peekable());
        loop {
            match (a.peek(), b.peek()) {
                (Some(&&x), Some(&&y)) if x < y => {
                    out.push(x);
                    a.next();
                }
                (Some(&&x), Some(&&y)) if x > y => {
                    out.push(y);
                    b.next();
                }
                (Some(&&x), Some(_)) => {
                    out.push(x);
                    a.next();
                    b.next();
                }
                (Some(&&x), None) => {
                    out.push(x);
                    a.next();
                }
                (None, Some(&&y)) => {
                    out.push(y);
                    b.next();
                }
                (None, None) => break,
            }
        }
        ItemSet(out)
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        ItemSet::from_unsorted(iter)
    }
}

impl std::fmt::Display for ItemSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unsorted_sorts_and_dedups() {
        let set = ItemSet::from_unsorted([5, 1, 3, 1, 5]);
        assert_eq!(set.items(), &[1, 3, 5]);
    }

    #[test]
    fn subset_walk() {
        let small = ItemSet::from_sorted(&[2, 7]);
        let big = ItemSet::from_sorted(&[1, 2, 5, 7, 9]);
        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
        assert!(ItemSet::new().is_subset_of(&small));
        assert!(!ItemSet::singleton(3).is_subset_of(&big));
    }

    #[test]
    fn extended_appends_greater() {
        let set = ItemSet::from_sorted(&[1, 4]).extended(9);
        assert_eq!(set.items(), &[1, 4, 9]);
    }

    #[test]
    fn union_merges_sorted() {
        let a = ItemSet::from_sorted(&[1, 3, 5]);
        let b = ItemSet::from_sorted(&[2, 3, 6]);
        assert_eq!(a.union(&b).items(), &[1, 2, 3, 5, 6]);
        assert_eq!(a.union(&ItemSet::new()).items(), a.items());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = ItemSet::from_sorted(&[1, 2]);
        let b = ItemSet::from_sorted(&[1, 3]);
        let c = ItemSet::from_sorted(&[1, 2, 4]);
        assert!(a < b);
        assert!(a < c);
        assert!(c < b);
    }
}
