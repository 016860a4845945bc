//! Specialized collection types

pub use slotmap::{SlotMap, new_key_type};

/// Grow-only pool whose slots are recycled by rewinding a cursor.
///
/// `acquire` reuses the slot under the cursor or grows the backing storage
/// when the cursor has reached the end. Storage is never released; `reset`
/// only moves the cursor back to the start so the next frame overwrites
/// the previous frame's values.
#[derive(Debug)]
pub struct FramePool<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> FramePool<T> {
    /// Create an empty pool
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
        }
    }

    /// Take the next slot, initialised with `value`, and return its index
    pub fn acquire(&mut self, value: T) -> usize {
        let index = self.cursor;
        if let Some(slot) = self.items.get_mut(index) {
            *slot = value;
        } else {
            self.items.push(value);
        }
        self.cursor += 1;
        index
    }

    /// Rewind the cursor; every slot becomes available again
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Get a slot handed out since the last reset
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.cursor {
            self.items.get(index)
        } else {
            None
        }
    }

    /// Get a mutable slot handed out since the last reset
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.cursor {
            self.items.get_mut(index)
        } else {
            None
        }
    }

    /// Slots handed out since the last reset
    pub const fn in_use(&self) -> usize {
        self.cursor
    }

    /// Slots ever allocated; never decreases
    pub fn allocated(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for FramePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_reuses_storage() {
        let mut pool = FramePool::new();
        pool.acquire(1);
        pool.acquire(2);
        assert_eq!(pool.allocated(), 2);

        pool.reset();
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.get(0), None);

        let idx = pool.acquire(7);
        assert_eq!(idx, 0);
        assert_eq!(pool.get(0), Some(&7));
        assert_eq!(pool.allocated(), 2);
    }

    #[test]
    fn test_pool_only_grows() {
        let mut pool = FramePool::new();
        for i in 0..5 {
            pool.acquire(i);
        }
        pool.reset();
        pool.acquire(0);
        assert_eq!(pool.allocated(), 5);
        assert_eq!(pool.in_use(), 1);
    }
}
