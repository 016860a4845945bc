//! Angular occlusion buffer
//!
//! Tracks which directions around the eye are already covered by solid
//! geometry. Arcs are kept as sorted, merged, inclusive ranges of binary
//! angles; an arc that wraps through angle 0 is split in two.

use crate::foundation::math::{BinaryAngle, Vec2};
use crate::render::api::scene::Occlusion;

/// Merged set of occluded view directions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AngleClipper {
    ranges: Vec<(u32, u32)>,
}

impl AngleClipper {
    /// Create a clipper with nothing occluded
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every occluded range
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Whether every direction is occluded
    pub fn is_full(&self) -> bool {
        self.ranges == [(0, u32::MAX)]
    }

    /// Occluded ranges, sorted and merged
    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    /// Occlude the arc running counterclockwise from `start` to `end`
    pub fn clip_range(&mut self, start: BinaryAngle, end: BinaryAngle) {
        if start.0 <= end.0 {
            self.insert(start.0, end.0);
        } else {
            self.insert(start.0, u32::MAX);
            self.insert(0, end.0);
        }
    }

    /// Occlude the directions covered by a view-relative segment
    pub fn clip_segment(&mut self, from: Vec2, to: Vec2) {
        let (start, end) = segment_arc(from, to);
        self.clip_range(start, end);
    }

    /// Whether any part of the counterclockwise arc `start`..`end` is open
    pub fn is_range_visible(&self, start: BinaryAngle, end: BinaryAngle) -> bool {
        if start.0 <= end.0 {
            !self.covers(start.0, end.0)
        } else {
            !self.covers(start.0, u32::MAX) || !self.covers(0, end.0)
        }
    }

    fn covers(&self, lo: u32, hi: u32) -> bool {
        self.ranges.iter().any(|&(a, b)| a <= lo && hi <= b)
    }

    fn insert(&mut self, lo: u32, hi: u32) {
        self.ranges.push((lo, hi));
        self.ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(self.ranges.len());
        for &(a, b) in &self.ranges {
            match merged.last_mut() {
                Some(last) if a <= last.1.saturating_add(1) => last.1 = last.1.max(b),
                _ => merged.push((a, b)),
            }
        }
        self.ranges = merged;
    }
}

/// The shorter arc spanned by a view-relative segment, counterclockwise
fn segment_arc(from: Vec2, to: Vec2) -> (BinaryAngle, BinaryAngle) {
    let a = BinaryAngle::between(from.x, from.y);
    let b = BinaryAngle::between(to.x, to.y);
    if b.wrapping_sub(a).0 <= BinaryAngle::ANG180 {
        (a, b)
    } else {
        (b, a)
    }
}

impl Occlusion for AngleClipper {
    fn is_segment_visible(&self, from: Vec2, to: Vec2) -> bool {
        let (start, end) = segment_arc(from, to);
        self.is_range_visible(start, end)
    }
}
