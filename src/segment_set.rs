//! Sorted set of disjoint integer ranges.
//!
//! Used by the polygon scanline to describe which fixed-point x ranges of a
//! row are inside a shape, and by the rasterizer to intersect path and clip
//! coverage. Ranges are half-open: `[min, max)`.

/// Sorted, non-overlapping, non-touching half-open integer ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntSegmentSet {
    segs: Vec<(i32, i32)>,
}

impl IntSegmentSet {
    pub fn new() -> Self {
        Self { segs: Vec::new() }
    }

    pub fn clear(&mut self) -> &mut Self {
        self.segs.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.segs.iter().copied()
    }

    /// Smallest contained value, if any.
    pub fn min(&self) -> Option<i32> {
        self.segs.first().map(|s| s.0)
    }

    /// One past the largest contained value, if any.
    pub fn max(&self) -> Option<i32> {
        self.segs.last().map(|s| s.1)
    }

    /// Insert `[min, max)`, merging with any range it overlaps or touches.
    /// Empty ranges are ignored.
    pub fn add(&mut self, min: i32, max: i32) {
        if max <= min {
            return;
        }
        // First range whose end reaches `min`.
        let start = self.segs.partition_point(|s| s.1 < min);
        // First range that starts strictly after `max`.
        let end = self.segs.partition_point(|s| s.0 <= max);
        if start == end {
            self.segs.insert(start, (min, max));
            return;
        }
        let new_min = min.min(self.segs[start].0);
        let new_max = max.max(self.segs[end - 1].1);
        self.segs[start] = (new_min, new_max);
        self.segs.drain(start + 1..end);
    }

    /// Whether `x` lies inside one of the ranges.
    pub fn contains(&self, x: i32) -> bool {
        let i = self.segs.partition_point(|s| s.1 <= x);
        i < self.segs.len() && self.segs[i].0 <= x
    }

    /// Replace the contents with the intersection of `a` and `b`.
    pub fn set_to_intersect(&mut self, a: &IntSegmentSet, b: &IntSegmentSet) {
        self.segs.clear();
        let (mut i, mut j) = (0, 0);
        while i < a.segs.len() && j < b.segs.len() {
            let (a0, a1) = a.segs[i];
            let (b0, b1) = b.segs[j];
            let lo = a0.max(b0);
            let hi = a1.min(b1);
            if hi > lo {
                self.segs.push((lo, hi));
            }
            if a1 < b1 {
                i += 1;
            } else {
                j += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(s: &IntSegmentSet) -> Vec<(i32, i32)> {
        s.iter().collect()
    }

    #[test]
    fn test_add_disjoint_keeps_order() {
        let mut s = IntSegmentSet::new();
        s.add(50, 60);
        s.add(10, 20);
        s.add(30, 40);
        assert_eq!(collect(&s), vec![(10, 20), (30, 40), (50, 60)]);
        assert_eq!(s.min(), Some(10));
        assert_eq!(s.max(), Some(60));
    }

    #[test]
    fn test_add_merges_overlapping_and_touching() {
        let mut s = IntSegmentSet::new();
        s.add(10, 20);
        s.add(30, 40);
        s.add(20, 30);
        assert_eq!(collect(&s), vec![(10, 40)]);

        s.add(5, 50);
        assert_eq!(collect(&s), vec![(5, 50)]);
    }

    #[test]
    fn test_add_empty_range_is_ignored() {
        let mut s = IntSegmentSet::new();
        s.add(10, 10);
        s.add(20, 5);
        assert!(s.is_empty());
    }

    #[test]
    fn test_contains_half_open() {
        let mut s = IntSegmentSet::new();
        s.add(10, 20);
        assert!(s.contains(10));
        assert!(s.contains(19));
        assert!(!s.contains(20));
        assert!(!s.contains(9));
    }

    #[test]
    fn test_intersect() {
        let mut a = IntSegmentSet::new();
        a.add(0, 10);
        a.add(20, 30);
        let mut b = IntSegmentSet::new();
        b.add(5, 25);
        let mut out = IntSegmentSet::new();
        out.set_to_intersect(&a, &b);
        assert_eq!(collect(&out), vec![(5, 10), (20, 25)]);

        b.clear();
        out.set_to_intersect(&a, &b);
        assert!(out.is_empty());
    }
}
