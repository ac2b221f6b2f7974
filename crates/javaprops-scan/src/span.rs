//! Physical line ranges.

/// A range of physical lines `[start, start + len)` owned by one
/// logical entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineSpan {
    /// Index of the first line (0-based).
    pub start: usize,
    /// Number of physical lines covered (at least 1 for a yielded entry).
    pub len: usize,
}

impl LineSpan {
    /// Create a new span from a start line and a line count.
    #[inline]
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Index one past the last covered line.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The span as an index range into a line list.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

impl From<LineSpan> for std::ops::Range<usize> {
    fn from(span: LineSpan) -> Self {
        span.range()
    }
}
