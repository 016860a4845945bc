//! Backend abstraction for the masked compositing pass
//!
//! This module defines the draw calls the compositor issues. A backend
//! receives fully resolved geometry and colors; it never sees light lists
//! or vissprite records.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Rgb, Rgba, Vec2, Vec3};
use crate::render::api::scene::{FlareFlags, FlareTexture, MaterialId, ModelId};
use crate::render::lighting::LightNode;
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Framebuffer blend mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Standard alpha blending
    #[default]
    Normal,
    /// Additive blending
    Add,
    /// Opaque texels with alpha ignored
    ZeroAlpha,
}

/// Per-vertex color as uploaded to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexColor {
    /// Red, green, blue and alpha in `[0, 1]`
    pub rgba: [f32; 4],
}

impl VertexColor {
    /// Color from an RGBA vector
    pub fn from_rgba(color: &Rgba) -> Self {
        Self {
            rgba: [color.x, color.y, color.z, color.w],
        }
    }

    /// Color from RGB plus alpha
    pub fn from_rgb(color: &Rgb, alpha: f32) -> Self {
        Self {
            rgba: [color.x, color.y, color.z, alpha],
        }
    }

    /// Alpha channel
    pub const fn alpha(&self) -> f32 {
        self.rgba[3]
    }
}

/// Rotation the backend applies to a sprite quad around its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadRotation {
    /// Draw as given
    None,
    /// Rotate by `pitch` degrees about the view side axis
    ViewPlane {
        /// Rotation in degrees
        pitch: f32,
        /// Rotation axis on the map plane
        axis: Vec2,
    },
    /// Lean towards the camera along the quad edge
    Camera {
        /// Rotation in degrees
        angle: f32,
        /// Rotation axis on the map plane
        axis: Vec2,
    },
}

/// A world sprite ready to draw.
///
/// Vertex layout is bottom-left, top-left, top-right, bottom-right.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteQuad {
    /// Corner positions
    pub vertices: [Vec3; 4],
    /// Surface normal shared by all corners
    pub normal: Vec3,
    /// Lit corner colors
    pub colors: [VertexColor; 4],
    /// Corner texture coordinates
    pub tex_coords: [[f32; 2]; 4],
    /// Sprite material
    pub material: MaterialId,
    /// Blend mode
    pub blend: BlendMode,
    /// Whether the quad writes depth
    pub depth_write: bool,
    /// Extra rotation around the sprite center
    pub rotation: QuadRotation,
    /// Rotation pivot
    pub center: Vec3,
}

/// A 3D model ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDraw<'a> {
    /// Model for the current frame
    pub model: ModelId,
    /// Model to interpolate towards
    pub next: Option<ModelId>,
    /// Interpolation fraction
    pub inter: f32,
    /// Model origin
    pub center: Vec3,
    /// Short-range visual offset
    pub srvo: Vec3,
    /// Top of the model
    pub gzt: f32,
    /// Camera distance
    pub distance: f32,
    /// Yaw in degrees
    pub yaw: f32,
    /// Additional yaw
    pub yaw_offset: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Additional pitch
    pub pitch_offset: f32,
    /// Scale Z down to face the view plane
    pub view_aligned: bool,
    /// Ambient color and alpha
    pub ambient: Rgba,
    /// Lights affecting the model, nearest first, capped per model
    pub lights: &'a [LightNode],
}

/// A halo or lens flare ready to draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaloDraw {
    /// Flare center
    pub center: Vec3,
    /// Flare size
    pub size: f32,
    /// Flare texture
    pub texture: FlareTexture,
    /// Flare color
    pub color: Rgb,
    /// Camera distance
    pub distance: f32,
    /// Visibility in `[0, 1]`
    pub occlusion: f32,
    /// Brightness multiplier
    pub multiplier: f32,
    /// Horizontal offset from the center
    pub x_offset: f32,
    /// Flare flags
    pub flags: FlareFlags,
}

/// A 2D first-person weapon sprite in screen space.
///
/// Vertex layout is top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponQuad {
    /// Top-left corner
    pub position: Vec2,
    /// Width in screen units
    pub width: f32,
    /// Height in screen units
    pub height: f32,
    /// Lit corner colors
    pub colors: [VertexColor; 4],
    /// Corner texture coordinates
    pub tex_coords: [[f32; 2]; 4],
    /// Sprite material
    pub material: MaterialId,
}

/// Main compositing backend trait
///
/// The compositor calls these in strict back-to-front order.
pub trait DrawBackend {
    /// Draw a world sprite
    fn draw_sprite_quad(&mut self, quad: &SpriteQuad) -> BackendResult<()>;

    /// Draw a world model
    fn draw_model(&mut self, model: &ModelDraw<'_>) -> BackendResult<()>;

    /// Draw a masked wall segment
    fn draw_masked_wall(&mut self, wall: &crate::render::vissprite::MaskedWall) -> BackendResult<()>;

    /// Draw a halo; returns whether anything was drawn
    fn draw_halo(&mut self, halo: &HaloDraw, primary: bool) -> BackendResult<bool>;

    /// Enter or leave the secondary halo pass
    fn set_halo_pass(&mut self, _active: bool) -> BackendResult<()> {
        Ok(())
    }

    /// Draw a first-person weapon model
    fn draw_weapon_model(&mut self, model: &ModelDraw<'_>) -> BackendResult<()>;

    /// Draw a 2D first-person weapon sprite
    fn draw_weapon_sprite(&mut self, quad: &WeaponQuad) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_colors_cast_to_floats() {
        let colors = [
            VertexColor::from_rgb(&Rgb::new(0.5, 0.25, 1.0), 0.75),
            VertexColor::from_rgba(&Rgba::new(0.0, 0.0, 0.0, 1.0)),
        ];
        let floats: &[f32] = bytemuck::cast_slice(&colors);
        assert_eq!(floats, &[0.5, 0.25, 1.0, 0.75, 0.0, 0.0, 0.0, 1.0]);
    }
}
