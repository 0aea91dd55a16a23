//! Minimal time-interval support.
//!
//! The clustering core does not own timeline arithmetic; it only consumes a
//! small capability: given the time intervals covered by a label, pad them,
//! test two coverages for intersection, and measure a union duration. This
//! module provides exactly that surface for the contiguity constraint.

/// A half-open time interval, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    /// Start time.
    pub start: f64,
    /// End time.
    pub end: f64,
}

impl Span {
    /// Create a span. `start > end` collapses to an empty span at `start`.
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Span duration.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Span extended by `amount` on both ends.
    pub fn pad(&self, amount: f64) -> Span {
        Span::new(self.start - amount, self.end + amount)
    }

    /// Strict overlap test (touching endpoints do not intersect).
    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A set of spans covered by one label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    spans: Vec<Span>,
}

impl Coverage {
    /// Coverage from a list of spans (need not be sorted or disjoint).
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    /// The underlying spans.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// True when no span is present.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Coverage with every span padded by `amount` on both ends.
    pub fn pad(&self, amount: f64) -> Coverage {
        Coverage::new(self.spans.iter().map(|s| s.pad(amount)).collect())
    }

    /// Do the two coverages share any instant?
    pub fn intersects(&self, other: &Coverage) -> bool {
        self.spans
            .iter()
            .any(|s| other.spans.iter().any(|t| s.intersects(t)))
    }

    /// Total duration of the union of all spans (overlaps counted once).
    pub fn duration(&self) -> f64 {
        let mut spans = self.spans.clone();
        spans.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut total = 0.0;
        let mut current: Option<Span> = None;
        for s in spans {
            match current {
                Some(ref mut c) if s.start <= c.end => {
                    c.end = c.end.max(s.end);
                }
                _ => {
                    if let Some(c) = current {
                        total += c.duration();
                    }
                    current = Some(s);
                }
            }
        }
        if let Some(c) = current {
            total += c.duration();
        }
        total
    }

    /// Union of several coverages.
    pub fn union(coverages: &[&Coverage]) -> Coverage {
        let spans = coverages
            .iter()
            .flat_map(|c| c.spans.iter().copied())
            .collect();
        Coverage::new(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_and_intersect() {
        let a = Span::new(0.0, 1.0);
        let b = Span::new(1.4, 2.0);
        assert!(!a.intersects(&b));
        assert!(a.pad(0.25).intersects(&b.pad(0.25)));
    }

    #[test]
    fn test_touching_spans_do_not_intersect() {
        let a = Span::new(0.0, 1.0);
        let b = Span::new(1.0, 2.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_union_duration_counts_overlap_once() {
        let c = Coverage::new(vec![
            Span::new(0.0, 2.0),
            Span::new(1.0, 3.0),
            Span::new(5.0, 6.0),
        ]);
        assert!((c.duration() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_coverage_union() {
        let a = Coverage::new(vec![Span::new(0.0, 1.0)]);
        let b = Coverage::new(vec![Span::new(2.0, 3.0)]);
        let u = Coverage::union(&[&a, &b]);
        assert_eq!(u.spans().len(), 2);
        assert!((u.duration() - 2.0).abs() < 1e-12);
    }
}
