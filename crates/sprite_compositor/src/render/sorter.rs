//! Back-to-front ordering of the frame's vissprites
//!
//! Selection sort over a doubly linked ring of record indices: repeatedly
//! take the farthest record out of the unsorted ring and append it to the
//! sorted ring. The first record holding the current maximum wins, so
//! equal distances come out in creation order. Quadratic, but the draw
//! order it produces is what blending relies on.

use crate::render::vissprite::VisSprite;

/// Linked-ring distance sorter; link storage is reused between frames
#[derive(Debug, Default)]
pub struct DistanceSorter {
    next: Vec<usize>,
    prev: Vec<usize>,
    len: usize,
}

impl DistanceSorter {
    /// Create an empty sorter
    pub fn new() -> Self {
        Self::default()
    }

    const fn unsorted_head(&self) -> usize {
        self.len
    }

    const fn sorted_head(&self) -> usize {
        self.len + 1
    }

    fn unlink(&mut self, node: usize) {
        let (prev, next) = (self.prev[node], self.next[node]);
        self.next[prev] = next;
        self.prev[next] = prev;
    }

    fn link_before(&mut self, node: usize, at: usize) {
        let prev = self.prev[at];
        self.next[prev] = node;
        self.prev[node] = prev;
        self.next[node] = at;
        self.prev[at] = node;
    }

    /// Order `records` by descending distance
    pub fn sort(&mut self, records: &[VisSprite]) {
        self.len = records.len();
        self.next.clear();
        self.prev.clear();
        self.next.resize(self.len + 2, 0);
        self.prev.resize(self.len + 2, 0);

        let unsorted = self.unsorted_head();
        let sorted = self.sorted_head();
        for head in [unsorted, sorted] {
            self.next[head] = head;
            self.prev[head] = head;
        }
        for index in 0..self.len {
            self.link_before(index, unsorted);
        }

        for _ in 0..self.len {
            let mut best = self.next[unsorted];
            let mut best_distance = records[best].distance;
            let mut cursor = self.next[best];
            while cursor != unsorted {
                if records[cursor].distance > best_distance {
                    best = cursor;
                    best_distance = records[cursor].distance;
                }
                cursor = self.next[cursor];
            }

            self.unlink(best);
            self.link_before(best, sorted);
        }
    }

    /// Record indices from farthest to nearest
    pub fn iter(&self) -> SortedIter<'_> {
        let head = self.sorted_head();
        SortedIter {
            sorter: self,
            cursor: self.next.get(head).copied().unwrap_or(head),
        }
    }

    /// Number of sorted records
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was sorted
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Iterator over sorted record indices
pub struct SortedIter<'a> {
    sorter: &'a DistanceSorter,
    cursor: usize,
}

impl Iterator for SortedIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.cursor >= self.sorter.len {
            return None;
        }
        let index = self.cursor;
        self.cursor = self.sorter.next[index];
        Some(index)
    }
}
