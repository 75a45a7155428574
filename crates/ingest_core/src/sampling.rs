//! Pure numeric helpers shared by the concrete stage tasks.

/// Uniformly spaced frame indices within `[start, end)`.
///
/// Spec §4.8.4 / testable property 5: for `i in [0, n)`,
/// `start + (i+1) * (end-start) / (n+1)`, using integer (floor) division
/// to match the original implementation's behavior on non-dividing spans.
pub fn uniform_frame_indices(start: i64, end: i64, n: usize) -> Vec<i64> {
    let span = end - start;
    (0..n as i64)
        .map(|i| start + (i + 1) * span / (n as i64 + 1))
        .collect()
}

/// A time span, used both for ASR tokens and for segment boundaries in
/// the overlap rule below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    /// Inclusive start frame.
    pub start: i64,
    /// Exclusive end frame.
    pub end: i64,
}

impl FrameSpan {
    /// Construct a new span.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    fn len(&self) -> i64 {
        self.end - self.start
    }

    fn intersection_len(&self, other: &FrameSpan) -> i64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end - start).max(0)
    }

    /// True if `self` is fully inside `segment`.
    pub fn fully_inside(&self, segment: &FrameSpan) -> bool {
        self.start >= segment.start && self.end <= segment.end
    }

    /// Overlap fraction of `self` covered by `segment`, as
    /// `overlap / (self.end - self.start)` (spec §4.8.5 / testable
    /// property 4).
    pub fn overlap_fraction(&self, segment: &FrameSpan) -> f64 {
        if self.len() <= 0 {
            return 0.0;
        }
        self.intersection_len(segment) as f64 / self.len() as f64
    }

    /// Whether this span counts as "related" to `segment`: fully inside
    /// or overlapping at least 80%.
    pub fn is_related_to(&self, segment: &FrameSpan) -> bool {
        self.fully_inside(segment) || self.overlap_fraction(segment) >= 0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_matches_spec_example() {
        assert_eq!(uniform_frame_indices(0, 100, 3), vec![25, 50, 75]);
    }

    #[test]
    fn sampling_matches_end_to_end_scenario() {
        // shot (0,100), n=2 -> start + (i+1)*100/3
        assert_eq!(uniform_frame_indices(0, 100, 2), vec![33, 66]);
        // shot (100,250), n=2 -> 100 + (i+1)*150/3
        assert_eq!(uniform_frame_indices(100, 250, 2), vec![150, 200]);
    }

    #[test]
    fn overlap_rule_applies_formula_literally() {
        // intersection/token_length, per the formula in the overlap rule
        // (token "b" overlaps the segment at 7/12 = 0.583, below the 0.8
        // threshold, so it is excluded despite the descriptive prose
        // example; see DESIGN.md for the discrepancy note).
        let segment = FrameSpan::new(0, 25);
        let a = FrameSpan::new(10, 20);
        let b = FrameSpan::new(18, 30);
        let c = FrameSpan::new(40, 50);
        assert!(a.is_related_to(&segment)); // fully inside
        assert!(!b.is_related_to(&segment)); // 0.583 < 0.8
        assert!(!c.is_related_to(&segment));
    }

    #[test]
    fn overlap_rule_end_to_end_scenario() {
        let seg1 = FrameSpan::new(0, 100);
        let seg2 = FrameSpan::new(100, 250);
        let hello = FrameSpan::new(0, 30);
        let world = FrameSpan::new(60, 90);
        let tail = FrameSpan::new(200, 240);
        assert!(hello.is_related_to(&seg1));
        assert!(world.is_related_to(&seg1));
        assert!(!tail.is_related_to(&seg1));
        assert!(!hello.is_related_to(&seg2));
        assert!(!world.is_related_to(&seg2));
        assert!(tail.is_related_to(&seg2));
    }

    #[test]
    fn overlap_threshold_boundary() {
        // span length 10, overlapping 8 with segment -> exactly 0.8
        let segment = FrameSpan::new(0, 8);
        let span = FrameSpan::new(0, 10);
        assert!((span.overlap_fraction(&segment) - 0.8).abs() < 1e-9);
        assert!(span.is_related_to(&segment));
    }
}
