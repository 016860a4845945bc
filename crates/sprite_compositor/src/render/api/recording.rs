//! Backend that records draw calls instead of rasterizing them

use crate::foundation::math::{Rgba, Vec3};
use crate::render::api::render_backend::{
    BackendResult, DrawBackend, HaloDraw, ModelDraw, SpriteQuad, WeaponQuad,
};
use crate::render::api::scene::{MaterialId, ModelId};
use crate::render::vissprite::MaskedWall;

/// Summary of a model draw
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedModel {
    /// Model drawn
    pub model: ModelId,
    /// Model origin
    pub center: Vec3,
    /// Final yaw including the offset
    pub yaw: f32,
    /// Final pitch including the offset
    pub pitch: f32,
    /// Ambient color
    pub ambient: Rgba,
    /// Number of lights passed along
    pub light_count: usize,
}

impl RecordedModel {
    fn from_draw(draw: &ModelDraw<'_>) -> Self {
        Self {
            model: draw.model,
            center: draw.center,
            yaw: draw.yaw + draw.yaw_offset,
            pitch: draw.pitch + draw.pitch_offset,
            ambient: draw.ambient,
            light_count: draw.lights.len(),
        }
    }
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    /// World sprite
    Sprite(SpriteQuad),
    /// World model
    Model(RecordedModel),
    /// Masked wall, identified by material
    MaskedWall(MaterialId),
    /// Halo
    Halo {
        /// Halo parameters
        halo: HaloDraw,
        /// Primary or secondary pass
        primary: bool,
    },
    /// Secondary halo pass toggled
    HaloPass(bool),
    /// First-person weapon model
    WeaponModel(RecordedModel),
    /// First-person 2D weapon sprite
    WeaponSprite(WeaponQuad),
}

/// Draw backend that keeps every call in order
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<DrawCall>,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded so far
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Forget recorded calls
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Recorded world sprites in draw order
    pub fn sprites(&self) -> impl Iterator<Item = &SpriteQuad> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::Sprite(quad) => Some(quad),
            _ => None,
        })
    }
}

impl DrawBackend for RecordingBackend {
    fn draw_sprite_quad(&mut self, quad: &SpriteQuad) -> BackendResult<()> {
        self.calls.push(DrawCall::Sprite(quad.clone()));
        Ok(())
    }

    fn draw_model(&mut self, model: &ModelDraw<'_>) -> BackendResult<()> {
        self.calls.push(DrawCall::Model(RecordedModel::from_draw(model)));
        Ok(())
    }

    fn draw_masked_wall(&mut self, wall: &MaskedWall) -> BackendResult<()> {
        self.calls.push(DrawCall::MaskedWall(wall.material));
        Ok(())
    }

    fn draw_halo(&mut self, halo: &HaloDraw, primary: bool) -> BackendResult<bool> {
        self.calls.push(DrawCall::Halo { halo: *halo, primary });
        Ok(halo.occlusion > 0.0)
    }

    fn set_halo_pass(&mut self, active: bool) -> BackendResult<()> {
        self.calls.push(DrawCall::HaloPass(active));
        Ok(())
    }

    fn draw_weapon_model(&mut self, model: &ModelDraw<'_>) -> BackendResult<()> {
        self.calls.push(DrawCall::WeaponModel(RecordedModel::from_draw(model)));
        Ok(())
    }

    fn draw_weapon_sprite(&mut self, quad: &WeaponQuad) -> BackendResult<()> {
        self.calls.push(DrawCall::WeaponSprite(quad.clone()));
        Ok(())
    }
}
