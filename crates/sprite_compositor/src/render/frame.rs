//! Per-frame render state
//!
//! [`FrameContext`] owns everything the sprite pipeline mutates while a
//! frame is built: the light pools, the vissprite buffer, the sorter, the
//! weapon records and the sky-fix height. Storage survives across frames;
//! [`FrameContext::begin_frame`] only rewinds it.

use std::collections::HashSet;

use crate::foundation::logging::debug;
use crate::foundation::math::Vec3;
use crate::render::api::scene::{ObjectId, ViewState};
use crate::render::lighting::LightLists;
use crate::render::sorter::DistanceSorter;
use crate::render::vissprite::{MaskedWall, VisPayload, VisSprite, VisSpriteBuffer, WeaponRecord};

/// Headroom added above the tallest sprite standing under an open sky
pub const SKY_FIX_MARGIN: f32 = 16.0;

/// Mutable state for one frame at a time
#[derive(Debug)]
pub struct FrameContext {
    lights: LightLists,
    vissprites: VisSpriteBuffer,
    sorter: DistanceSorter,
    weapons: Vec<WeaponRecord>,
    projected: HashSet<ObjectId>,
    sky_fix_ceiling: f32,
    frame_count: u64,
}

impl FrameContext {
    /// Create a context whose vissprite buffer holds `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            lights: LightLists::new(),
            vissprites: VisSpriteBuffer::with_capacity(capacity),
            sorter: DistanceSorter::new(),
            weapons: Vec::new(),
            projected: HashSet::new(),
            sky_fix_ceiling: f32::MIN,
            frame_count: 0,
        }
    }

    /// Rewind every per-frame store.
    ///
    /// Light handles and vissprite indices from the previous frame become
    /// invalid. The sky-fix height is map state and is kept.
    pub fn begin_frame(&mut self) {
        if self.frame_count > 0 {
            debug!(
                "Frame {}: {} vissprite(s), {} dropped, {} light list(s), {} light node(s)",
                self.frame_count,
                self.vissprites.len(),
                self.vissprites.dropped(),
                self.lights.list_count(),
                self.lights.node_count()
            );
        }

        self.lights.begin_frame();
        self.vissprites.clear();
        self.sorter.sort(&[]);
        self.weapons.clear();
        self.projected.clear();
        self.frame_count += 1;
    }

    /// Frames begun so far
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Light lists for this frame
    pub const fn lights(&self) -> &LightLists {
        &self.lights
    }

    /// Mutable light lists for this frame
    pub fn lights_mut(&mut self) -> &mut LightLists {
        &mut self.lights
    }

    /// Vissprites stored this frame
    pub const fn vissprites(&self) -> &VisSpriteBuffer {
        &self.vissprites
    }

    /// Store a vissprite; `None` when the buffer overflowed
    pub fn push_vissprite(&mut self, record: VisSprite) -> Option<usize> {
        self.vissprites.push(record)
    }

    /// Store a masked wall segment at the distance of its midpoint
    pub fn add_masked_wall(&mut self, wall: MaskedWall, view: &ViewState) -> Option<usize> {
        let center = wall
            .vertices
            .iter()
            .fold(Vec3::zeros(), |sum, vertex| sum + vertex.position)
            / 4.0;
        let distance = view.point_distance(center);
        self.vissprites.push(VisSprite {
            center,
            distance,
            payload: VisPayload::MaskedWall(wall),
        })
    }

    /// Mark an object as projected; `false` if it already was this frame
    pub fn mark_projected(&mut self, object: ObjectId) -> bool {
        self.projected.insert(object)
    }

    /// Store a first-person weapon record
    pub fn push_weapon(&mut self, record: WeaponRecord) {
        self.weapons.push(record);
    }

    /// Weapon records in projection order
    pub fn weapons(&self) -> &[WeaponRecord] {
        &self.weapons
    }

    /// Sky-fix ceiling height
    pub const fn sky_fix_ceiling(&self) -> f32 {
        self.sky_fix_ceiling
    }

    /// Reset the sky-fix height, e.g. on map load
    pub fn set_sky_fix_ceiling(&mut self, height: f32) {
        self.sky_fix_ceiling = height;
    }

    /// Raise the sky fix so a sprite top at `top` stays below it
    pub fn raise_sky_fix(&mut self, top: f32) -> bool {
        let raised = top + SKY_FIX_MARGIN;
        if raised > self.sky_fix_ceiling {
            self.sky_fix_ceiling = raised;
            return true;
        }
        false
    }

    /// Order this frame's vissprites back to front
    pub fn sort(&mut self) {
        self.sorter.sort(self.vissprites.records());
    }

    /// Vissprites from farthest to nearest, as of the last [`Self::sort`]
    pub fn sorted(&self) -> impl Iterator<Item = &VisSprite> {
        self.sorter
            .iter()
            .filter_map(|index| self.vissprites.get(index))
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new(crate::core::config::RenderConfig::DEFAULT_MAX_VISSPRITES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{BinaryAngle, Rgba};
    use crate::render::api::render_backend::BlendMode;
    use crate::render::api::scene::MaterialId;
    use crate::render::vissprite::MaskedWallVertex;

    fn wall_at(x: f32, material: u32) -> MaskedWall {
        let vertex = |y: f32, z: f32| MaskedWallVertex {
            position: Vec3::new(x, y, z),
            color: Rgba::new(1.0, 1.0, 1.0, 1.0),
        };
        MaskedWall {
            vertices: [vertex(-8.0, 0.0), vertex(-8.0, 64.0), vertex(8.0, 0.0), vertex(8.0, 64.0)],
            material: MaterialId(material),
            tex_coords: [[0.0, 1.0], [0.0, 1.0]],
            blend: BlendMode::Normal,
            modulation: None,
        }
    }

    #[test]
    fn test_masked_walls_sort_back_to_front() {
        let view = ViewState::new(Vec3::zeros(), BinaryAngle(0));
        let mut frame = FrameContext::new(16);
        frame.begin_frame();

        frame.add_masked_wall(wall_at(50.0, 1), &view);
        frame.add_masked_wall(wall_at(150.0, 2), &view);
        frame.sort();

        let distances: Vec<f32> = frame.sorted().map(|record| record.distance).collect();
        assert_eq!(distances, vec![150.0, 50.0]);
        assert_eq!(frame.sorted().next().map(|r| r.center.z), Some(32.0));
    }

    #[test]
    fn test_begin_frame_rewinds_but_keeps_sky_fix() {
        let view = ViewState::new(Vec3::zeros(), BinaryAngle(0));
        let mut frame = FrameContext::new(4);
        frame.begin_frame();
        frame.add_masked_wall(wall_at(10.0, 1), &view);
        assert!(frame.mark_projected(ObjectId(3)));
        assert!(!frame.mark_projected(ObjectId(3)));
        frame.set_sky_fix_ceiling(128.0);
        assert!(frame.raise_sky_fix(120.0));
        assert!(!frame.raise_sky_fix(100.0));
        frame.sort();

        frame.begin_frame();
        assert!(frame.vissprites().is_empty());
        assert_eq!(frame.sorted().count(), 0);
        assert!(frame.mark_projected(ObjectId(3)));
        assert_eq!(frame.sky_fix_ceiling(), 136.0);
        assert_eq!(frame.frame_count(), 2);
    }
}
