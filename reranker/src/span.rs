use std::fmt;
use std::ops::Range;

/// Span of a node.
///
/// Spans are half-open ranges of string positions: `start` is the position before the first
/// covered terminal and `end` the position after the last one. Spans do not cover the `end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Lower bounds of the span.
    pub start: usize,
    /// Upper bounds of the span.
    pub end: usize,
}

impl From<usize> for Span {
    fn from(idx: usize) -> Self {
        Span {
            start: idx,
            end: idx + 1,
        }
    }
}

impl Span {
    /// Create new span.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "Span start has to be smaller or equal to end.");
        Span { start, end }
    }

    /// Return the number of covered terminals.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Return whether the span covers no terminal.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Return whether the span covers the index.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && self.end > index
    }

    /// Return whether the span covers all indices of another span.
    pub fn covers_span(&self, other: &Span) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Return whether the span shares at least one index with `range`.
    pub fn overlaps(&self, range: Range<usize>) -> bool {
        self.start < range.end && self.end > range.start
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use crate::Span;

    #[test]
    fn span_bounds() {
        let span = Span::new(1, 4);
        assert_eq!(span.len(), 3);
        assert!(!span.is_empty());
        assert!(span.contains(1));
        assert!(span.contains(3));
        assert!(!span.contains(4));
        assert!(span.covers_span(&Span::from(2)));
        assert!(!span.covers_span(&Span::new(0, 2)));
        assert!(span.overlaps(3..5));
        assert!(!span.overlaps(4..6));
        assert!(!span.overlaps(0..1));
        assert!(Span::new(2, 2).is_empty());
        assert_eq!(format!("{}", span), "1-4");
    }

    #[test]
    #[should_panic]
    fn inverted_span() {
        Span::new(3, 2);
    }
}
