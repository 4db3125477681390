//! Mini-batch partitioning over a dataset index range.

/// Half-open index interval `[start, end)` into a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    /// Number of samples covered by this range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Partition of `[0, len)` into contiguous mini-batches.
///
/// Ranges are produced in increasing order, all of `batch_size`
/// samples except possibly the last. The sequence is lazy and can be
/// re-enumerated every epoch at no cost.
#[derive(Debug, Clone, Copy)]
pub struct Batches {
    len: usize,
    batch_size: usize,
}

impl Batches {
    /// Create a partition of `len` samples into batches of `batch_size`.
    pub fn new(len: usize, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be at least 1");
        Self { len, batch_size }
    }

    /// Number of batches: `ceil(len / batch_size)`
    pub fn count(&self) -> usize {
        (self.len + self.batch_size - 1) / self.batch_size
    }

    /// Enumerate the batch ranges. An empty dataset yields no batches.
    pub fn iter(&self) -> impl Iterator<Item = BatchRange> {
        let Self { len, batch_size } = *self;
        (0..self.count()).map(move |k| BatchRange {
            start: k * batch_size,
            end: ((k + 1) * batch_size).min(len),
        })
    }
}
