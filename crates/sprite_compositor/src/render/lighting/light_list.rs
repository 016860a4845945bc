//! Pooled per-frame light lists
//!
//! Nodes and lists live in grow-only pools that are rewound at the start of
//! every frame. A list is addressed by a 1-based [`LightListHandle`]; handle
//! 0 means "no lights" and is what full-bright objects carry.

use std::ops::ControlFlow;

use crate::foundation::collections::FramePool;
use crate::foundation::math::{Rgb, Vec3};

/// A light as it affects one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightNode {
    /// Unit vector from the lit point towards the light
    pub direction: Vec3,
    /// Light color, already scaled by intensity
    pub color: Rgb,
    /// Distance used for ordering
    pub approx_dist: f32,
    /// Accumulates into the ambient channel rather than the extra channel
    pub affected_by_ambient: bool,
    /// Weight applied when the surface faces the light
    pub light_side: f32,
    /// Weight applied when the surface faces away
    pub dark_side: f32,
    /// Bias added to the facing term
    pub offset: f32,
}

impl Default for LightNode {
    fn default() -> Self {
        Self {
            direction: Vec3::zeros(),
            color: Rgb::zeros(),
            approx_dist: 0.0,
            affected_by_ambient: true,
            light_side: 1.0,
            dark_side: 0.0,
            offset: 0.0,
        }
    }
}

/// Handle to a light list created this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightListHandle(u32);

impl LightListHandle {
    /// The empty handle
    pub const NONE: Self = Self(0);

    /// Whether this is the empty handle
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Raw 1-based value
    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

#[derive(Debug, Clone, Copy)]
struct PooledNode {
    light: LightNode,
    next: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct LightList {
    head: Option<usize>,
    sort_by_distance: bool,
}

/// Frame-scoped storage for every light list
#[derive(Debug, Default)]
pub struct LightLists {
    nodes: FramePool<PooledNode>,
    lists: FramePool<LightList>,
}

impl LightLists {
    /// Create empty pools
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every handle and recycle all nodes
    pub fn begin_frame(&mut self) {
        self.nodes.reset();
        self.lists.reset();
    }

    /// Start a new, empty list
    pub fn new_list(&mut self, sort_by_distance: bool) -> LightListHandle {
        let index = self.lists.acquire(LightList {
            head: None,
            sort_by_distance,
        });
        LightListHandle(u32::try_from(index + 1).unwrap_or(u32::MAX))
    }

    /// Add a light to a list.
    ///
    /// Sorted lists keep ascending distance order, with a new node placed
    /// after existing nodes at the same distance. Unsorted lists prepend.
    /// Pushing to a stale or empty handle does nothing.
    pub fn push(&mut self, handle: LightListHandle, light: LightNode) {
        let Some(list) = handle.index().and_then(|i| self.lists.get(i)).copied() else {
            return;
        };
        let node = self.nodes.acquire(PooledNode { light, next: None });

        if !list.sort_by_distance {
            self.link_after(handle, None, node, list.head);
            return;
        }

        let mut prev = None;
        let mut cursor = list.head;
        while let Some(current) = cursor {
            let Some(existing) = self.nodes.get(current) else {
                break;
            };
            if existing.light.approx_dist > light.approx_dist {
                break;
            }
            prev = Some(current);
            cursor = existing.next;
        }
        self.link_after(handle, prev, node, cursor);
    }

    fn link_after(
        &mut self,
        handle: LightListHandle,
        prev: Option<usize>,
        node: usize,
        next: Option<usize>,
    ) {
        if let Some(pooled) = self.nodes.get_mut(node) {
            pooled.next = next;
        }
        match prev {
            Some(prev) => {
                if let Some(pooled) = self.nodes.get_mut(prev) {
                    pooled.next = Some(node);
                }
            }
            None => {
                if let Some(list) = handle.index().and_then(|i| self.lists.get_mut(i)) {
                    list.head = Some(node);
                }
            }
        }
    }

    /// Iterate the lights of a list; handle 0 or a stale handle yields nothing
    pub fn iter(&self, handle: LightListHandle) -> LightListIter<'_> {
        let head = handle
            .index()
            .and_then(|i| self.lists.get(i))
            .and_then(|list| list.head);
        LightListIter {
            lists: self,
            cursor: head,
        }
    }

    /// Visit the lights of a list until the callback breaks.
    ///
    /// Returns `true` when the traversal ran to completion.
    pub fn for_each<F>(&self, handle: LightListHandle, mut f: F) -> bool
    where
        F: FnMut(&LightNode) -> ControlFlow<()>,
    {
        for light in self.iter(handle) {
            if f(light).is_break() {
                return false;
            }
        }
        true
    }

    /// Lists created this frame
    pub fn list_count(&self) -> usize {
        self.lists.in_use()
    }

    /// Nodes handed out this frame
    pub fn node_count(&self) -> usize {
        self.nodes.in_use()
    }

    /// Nodes ever allocated; never shrinks
    pub fn allocated_nodes(&self) -> usize {
        self.nodes.allocated()
    }
}

/// Iterator over one light list
pub struct LightListIter<'a> {
    lists: &'a LightLists,
    cursor: Option<usize>,
}

impl<'a> Iterator for LightListIter<'a> {
    type Item = &'a LightNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.lists.nodes.get(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.light)
    }
}
