use std::{cmp::Ordering, cmp::Reverse, collections::BinaryHeap};

/// `f64` ordered with [`f64::total_cmp`] so it can live in a heap.
#[derive(Debug, Clone, Copy)]
struct TotalF64(f64);

impl PartialEq for TotalF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Streaming median using a max-heap for the lower half and a min-heap for the upper half.
///
/// The lower half always holds the same number of values as the upper half, or one more.
/// Each push is `O(log n)`; reading the median is `O(1)`.
///
/// # Examples
///
/// ```
/// use featurizer_stats::median::StreamingMedian;
///
/// let mut median = StreamingMedian::new();
/// assert_eq!(median.median(true), None);
/// median.extend([4.0, 1.0, 7.0]);
/// assert_eq!(median.median(true), Some(4.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamingMedian {
    lower: BinaryHeap<TotalF64>,
    upper: BinaryHeap<Reverse<TotalF64>>,
}

impl StreamingMedian {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        let value = TotalF64(value);
        if self.lower.peek().is_none_or(|top| value <= *top) {
            self.lower.push(value);
        } else {
            self.upper.push(Reverse(value));
        }

        if self.lower.len() >= self.upper.len() + 2 {
            if let Some(top) = self.lower.pop() {
                self.upper.push(Reverse(top));
            }
        } else if self.upper.len() > self.lower.len()
            && let Some(Reverse(top)) = self.upper.pop()
        {
            self.lower.push(top);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lower.len() + self.upper.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Returns the median of the values pushed so far.
    ///
    /// With an even number of values, `interpolate` selects between the mean of the two
    /// middle values (`true`) and the lower middle value (`false`).
    #[must_use]
    pub fn median(&self, interpolate: bool) -> Option<f64> {
        let lower = self.lower.peek()?.0;
        if !interpolate || self.len() % 2 == 1 {
            return Some(lower);
        }
        let upper = self.upper.peek().map_or(lower, |Reverse(v)| v.0);
        Some(f64::midpoint(lower, upper))
    }
}

impl Extend<f64> for StreamingMedian {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in iter {
            self.push(value);
        }
    }
}
