use std::collections::{BTreeMap, btree_map};

/// Occurrence counts for discrete values.
///
/// Keys are kept in ascending order, so iteration is deterministic for any `Ord` key.
///
/// # Examples
///
/// ```
/// use featurizer_stats::histogram::CountHistogram;
///
/// let mut histogram = CountHistogram::new();
/// for value in ["a", "b", "a"] {
///     histogram.add(value);
/// }
/// assert_eq!(histogram.count(&"a"), 2);
/// assert_eq!(histogram.count(&"c"), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountHistogram<K> {
    counts: BTreeMap<K, u64>,
}

impl<K> Default for CountHistogram<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<K> CountHistogram<K>
where
    K: Ord,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `key`.
    pub fn add(&mut self, key: K) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Returns how many times `key` was recorded.
    #[must_use]
    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Returns an iterator over `(key, count)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> + '_ {
        self.counts.iter().map(|(key, count)| (key, *count))
    }

    /// Total number of recorded occurrences.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn into_counts(self) -> BTreeMap<K, u64> {
        self.counts
    }
}

impl<K> IntoIterator for CountHistogram<K> {
    type Item = (K, u64);
    type IntoIter = btree_map::IntoIter<K, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}
