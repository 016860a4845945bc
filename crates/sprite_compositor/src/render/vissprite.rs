//! Per-frame draw records
//!
//! Everything the masked pass draws is a [`VisSprite`]: world sprites,
//! model proxies, masked wall segments and flares. Records live in a
//! fixed-capacity buffer that is emptied at the start of every frame.

use crate::foundation::logging::warn;
use crate::foundation::math::{Rgb, Rgba, Vec2, Vec3};
use crate::render::api::render_backend::BlendMode;
use crate::render::api::scene::{FlareFlags, FlareTexture, MaterialId, ModelId, ObjectId};
use crate::render::lighting::LightListHandle;

/// A world sprite
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteParams {
    /// Sprite material
    pub material: MaterialId,
    /// Flip in s and t
    pub flip: [bool; 2],
    /// Blend mode
    pub blend: BlendMode,
    /// Width in world units
    pub width: f32,
    /// Height in world units
    pub height: f32,
    /// Texture coordinate of the bottom-right corner
    pub tex_coord: [f32; 2],
    /// Top of the sprite
    pub gzt: f32,
    /// Horizontal offset of the quad from the center
    pub view_offset: f32,
    /// Foot clip including bobbing
    pub floor_clip: f32,
    /// Short-range visual offset
    pub srvo: Vec3,
    /// Ambient color and alpha
    pub ambient: Rgba,
    /// Dynamic lights; none when full bright
    pub lights: LightListHandle,
    /// Faces the view plane
    pub view_aligned: bool,
    /// Never writes depth
    pub no_z_write: bool,
}

/// A 3D model standing in for a sprite
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Model for the current frame
    pub model: ModelId,
    /// Model to interpolate towards
    pub next: Option<ModelId>,
    /// Interpolation fraction
    pub inter: f32,
    /// Owning object, if any
    pub object: Option<ObjectId>,
    /// Yaw in degrees
    pub yaw: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Additional yaw
    pub yaw_offset: f32,
    /// Additional pitch
    pub pitch_offset: f32,
    /// Short-range visual offset, floor clip included
    pub srvo: Vec3,
    /// Top of the object
    pub gzt: f32,
    /// Ambient color and alpha
    pub ambient: Rgba,
    /// Dynamic lights; none when full bright
    pub lights: LightListHandle,
    /// Drawn full bright
    pub full_bright: bool,
    /// Faces the view plane
    pub view_aligned: bool,
}

/// One corner of a masked wall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskedWallVertex {
    /// World position
    pub position: Vec3,
    /// Lit color
    pub color: Rgba,
}

/// Dynamic light texture blended over a masked wall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallModulation {
    /// Light texture
    pub texture: u32,
    /// Light color
    pub color: Rgb,
    /// Texture coordinates as `[[s0, s1], [t0, t1]]`
    pub tex_coords: [[f32; 2]; 2],
}

/// A masked (see-through) wall segment
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedWall {
    /// Corners: bottom-left, top-left, bottom-right, top-right
    pub vertices: [MaskedWallVertex; 4],
    /// Wall material
    pub material: MaterialId,
    /// Texture coordinates as `[[s0, s1], [t0, t1]]`
    pub tex_coords: [[f32; 2]; 2],
    /// Blend mode
    pub blend: BlendMode,
    /// Optional dynamic light modulation
    pub modulation: Option<WallModulation>,
}

/// A light flare
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlareParams {
    /// Flare size
    pub size: f32,
    /// Flare color
    pub color: Rgb,
    /// Flare texture
    pub texture: FlareTexture,
    /// Horizontal offset from the center
    pub x_offset: f32,
    /// Flare flags
    pub flags: FlareFlags,
    /// Occlusion factor, low 7 bits used
    pub factor: u8,
    /// Brightness multiplier
    pub multiplier: f32,
}

impl FlareParams {
    /// Visibility in `[0, 1]`
    pub fn occlusion(&self) -> f32 {
        f32::from(self.factor & 0x7f) / 127.0
    }
}

/// Kind-specific record data
#[derive(Debug, Clone, PartialEq)]
pub enum VisPayload {
    /// World sprite
    Sprite(SpriteParams),
    /// Model proxy
    Model(ModelParams),
    /// Masked wall segment
    MaskedWall(MaskedWall),
    /// Light flare
    Flare(FlareParams),
}

/// One draw record of the masked pass
#[derive(Debug, Clone, PartialEq)]
pub struct VisSprite {
    /// World center
    pub center: Vec3,
    /// Camera distance, used for ordering
    pub distance: f32,
    /// Kind-specific data
    pub payload: VisPayload,
}

impl VisSprite {
    /// Short name of the record kind, for logging
    pub const fn kind_name(&self) -> &'static str {
        match self.payload {
            VisPayload::Sprite(_) => "sprite",
            VisPayload::Model(_) => "model",
            VisPayload::MaskedWall(_) => "masked wall",
            VisPayload::Flare(_) => "flare",
        }
    }
}

/// A projected first-person weapon
#[derive(Debug, Clone, PartialEq)]
pub enum WeaponRecord {
    /// Weapon drawn as a model
    Model {
        /// Eye position
        center: Vec3,
        /// Model parameters
        params: ModelParams,
    },
    /// Weapon drawn as a 2D sprite
    Sprite(WeaponSpriteParams),
}

/// A 2D first-person weapon sprite
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponSpriteParams {
    /// Top-left corner in screen space
    pub position: Vec2,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
    /// Sprite material
    pub material: MaterialId,
    /// Horizontal flip
    pub flip: bool,
    /// Texture coordinate of the bottom-right corner
    pub tex_coord: [f32; 2],
    /// Ambient color and alpha
    pub ambient: Rgba,
    /// Dynamic lights; none when full bright
    pub lights: LightListHandle,
}

/// Fixed-capacity store for a frame's vissprites.
///
/// Records past capacity are dropped and counted; they never reach the
/// sorted output.
#[derive(Debug)]
pub struct VisSpriteBuffer {
    records: Vec<VisSprite>,
    capacity: usize,
    dropped: usize,
}

impl VisSpriteBuffer {
    /// Create a buffer holding at most `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Empty the buffer for a new frame
    pub fn clear(&mut self) {
        self.records.clear();
        self.dropped = 0;
    }

    /// Store a record; returns its index, or `None` when it overflowed
    pub fn push(&mut self, record: VisSprite) -> Option<usize> {
        if self.records.len() >= self.capacity {
            if self.dropped == 0 {
                warn!(
                    "Vissprite buffer full ({} records); dropping {} and further records this frame",
                    self.capacity,
                    record.kind_name()
                );
            }
            self.dropped += 1;
            return None;
        }
        self.records.push(record);
        Some(self.records.len() - 1)
    }

    /// Records stored this frame
    pub fn records(&self) -> &[VisSprite] {
        &self.records
    }

    /// Record by index
    pub fn get(&self, index: usize) -> Option<&VisSprite> {
        self.records.get(index)
    }

    /// Number of records stored this frame
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were stored this frame
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records per frame
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records that overflowed this frame
    pub const fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flare_at(distance: f32) -> VisSprite {
        VisSprite {
            center: Vec3::zeros(),
            distance,
            payload: VisPayload::Flare(FlareParams {
                size: 8.0,
                color: Rgb::new(1.0, 1.0, 1.0),
                texture: FlareTexture::Automatic,
                x_offset: 0.0,
                flags: FlareFlags::empty(),
                factor: 0x7f,
                multiplier: 1.0,
            }),
        }
    }

    #[test]
    fn test_records_past_capacity_are_dropped() {
        let mut buffer = VisSpriteBuffer::with_capacity(2);
        assert_eq!(buffer.push(flare_at(1.0)), Some(0));
        assert_eq!(buffer.push(flare_at(2.0)), Some(1));
        assert_eq!(buffer.push(flare_at(3.0)), None);
        assert_eq!(buffer.push(flare_at(4.0)), None);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped(), 2);
        let kept: Vec<f32> = buffer.records().iter().map(|r| r.distance).collect();
        assert_eq!(kept, vec![1.0, 2.0]);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped(), 0);
        assert_eq!(buffer.push(flare_at(5.0)), Some(0));
    }

    #[test]
    fn test_flare_occlusion_uses_low_bits() {
        let mut flare = match flare_at(0.0).payload {
            VisPayload::Flare(flare) => flare,
            _ => unreachable!(),
        };
        assert!((flare.occlusion() - 1.0).abs() < f32::EPSILON);
        flare.factor = 0x80;
        assert!(flare.occlusion().abs() < f32::EPSILON);
    }
}
