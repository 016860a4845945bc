//! Memory management utilities

/// Index of a value allocated from a [`BlockArena`]
pub type ArenaIndex = usize;

/// Bump allocator that hands out values in fixed-size blocks.
///
/// Values are never freed individually; the whole arena is discarded at
/// once. Blocks are allocated with their full capacity up front, so an
/// allocation never moves values that were handed out earlier.
pub struct BlockArena<T> {
    block_size: usize,
    blocks: Vec<Vec<T>>,
    len: usize,
}

impl<T> BlockArena<T> {
    /// Create an arena that grows `block_size` values at a time
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            blocks: Vec::new(),
            len: 0,
        }
    }

    /// Move `value` into the arena and return its index
    pub fn alloc(&mut self, value: T) -> ArenaIndex {
        let needs_block = self
            .blocks
            .last()
            .map_or(true, |block| block.len() == self.block_size);
        if needs_block {
            self.blocks.push(Vec::with_capacity(self.block_size));
        }
        if let Some(block) = self.blocks.last_mut() {
            block.push(value);
        }
        self.len += 1;
        self.len - 1
    }

    /// Get a value by index
    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.blocks
            .get(index / self.block_size)?
            .get(index % self.block_size)
    }

    /// Get a mutable reference to a value by index
    pub fn get_mut(&mut self, index: ArenaIndex) -> Option<&mut T> {
        self.blocks
            .get_mut(index / self.block_size)?
            .get_mut(index % self.block_size)
    }

    /// Number of values allocated so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of blocks backing the arena
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate values in allocation order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.blocks.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_stable_across_blocks() {
        let mut arena = BlockArena::with_block_size(2);
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        let c = arena.alloc("c");

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(arena.block_count(), 2);
        assert_eq!(arena.get(c), Some(&"c"));
        assert_eq!(arena.get(3), None);
        assert_eq!(arena.iter().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut arena = BlockArena::with_block_size(4);
        let idx = arena.alloc(1_u32);
        *arena.get_mut(idx).unwrap() += 41;
        assert_eq!(arena.get(idx), Some(&42));
    }
}
