//! # Render Configuration
//!
//! Serializable settings for sprite projection, light binding, weapon sprites
//! and halos. Every section has defaults matching the classic renderer, so a
//! config file only needs to name the values it changes.
//!
//! ## Configuration Categories
//!
//! - **Sprite Config**: model substitution, SRVO, alignment, blending
//! - **Lighting Config**: light radius, glow planes, attenuation, adaptation
//! - **Weapon Config**: first-person sprite offsets and lighting
//! - **Halo Config**: flare size and secondary halo pass

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// How sprites are rotated towards the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpriteAlignment {
    /// Only objects flagged as view aligned face the view plane
    #[default]
    Default,
    /// Every sprite faces the view plane
    Always,
    /// Sprites lean towards the camera past a maximum angle
    Camera,
    /// Sprites follow the view plane including pitch
    ViewPlane,
}

impl SpriteAlignment {
    /// Whether every sprite is treated as view aligned during projection
    pub const fn forces_view_aligned(self) -> bool {
        matches!(self, Self::Always)
    }

    /// Whether the projected line is built perpendicular to the view direction
    pub const fn projects_along_view_plane(self) -> bool {
        matches!(self, Self::ViewPlane)
    }
}

/// # Sprite Configuration
///
/// Controls how world objects are turned into sprites or model proxies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Substitute 3D models for sprites where a model definition exists
    pub use_models: bool,
    /// Beyond this 2D distance models fall back to sprites; 0 disables the check
    pub max_model_distance: f32,
    /// Short-range visual offset level: 0 off, 1 models, 2 models and sprites
    pub use_srvo: u8,
    /// Use the smoothed visual angle for model yaw
    pub use_srvo_angle: bool,
    /// Sprite alignment policy
    pub always_align: SpriteAlignment,
    /// Pitch in degrees past which camera-aligned sprites start to lean
    pub max_sprite_angle: f32,
    /// Draw fully opaque sprites with the "zero alpha" blend mode
    pub no_sprite_trans: bool,
    /// Honour per-sprite blend modes; when off everything blends normally
    pub use_sprite_blend: bool,
    /// Honour per-object alpha; when off sprites are opaque
    pub use_sprite_alpha: bool,
    /// Never write sprites into the depth buffer
    pub no_sprite_z_write: bool,
    /// Multiplier for spinning model yaw
    pub model_spin_speed: f32,
}

impl SpriteConfig {
    /// Create a sprite configuration with defaults
    pub fn new() -> Self {
        Self {
            use_models: true,
            max_model_distance: 1500.0,
            use_srvo: 2,
            use_srvo_angle: true,
            always_align: SpriteAlignment::Default,
            max_sprite_angle: 60.0,
            no_sprite_trans: false,
            use_sprite_blend: true,
            use_sprite_alpha: true,
            no_sprite_z_write: false,
            model_spin_speed: 1.0,
        }
    }

    /// Enable or disable model substitution
    pub fn with_models(mut self, enabled: bool) -> Self {
        self.use_models = enabled;
        self
    }

    /// Set the SRVO level
    pub fn with_srvo(mut self, level: u8) -> Self {
        self.use_srvo = level;
        self
    }

    /// Set the alignment policy
    pub fn with_alignment(mut self, align: SpriteAlignment) -> Self {
        self.always_align = align;
        self
    }
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Lighting Configuration
///
/// Controls ambient sampling and dynamic light collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Lights further than this from a sprite are ignored
    pub max_radius: f32,
    /// Maximum lights applied per vertex, world light included; 0 is unlimited
    pub sprite_max_lights: usize,
    /// Maximum lights passed to a model, world light included; 0 is unlimited
    pub model_max_lights: usize,
    /// Scale applied to glowing plane heights
    pub glow_height_factor: f32,
    /// Upper bound for a glowing plane's height
    pub glow_height_max: f32,
    /// Distance over which region light falls off; 0 disables attenuation
    pub distance_attenuation: f32,
    /// Light range compression in `[-1, 1]`
    pub light_range_compression: f32,
    /// Global ambient light floor in `[0, 255]`
    pub ambient_light: u8,
    /// Attenuate the torch with distance
    pub attenuate_torch: bool,
    /// Render the whole level full bright
    pub level_full_bright: bool,
}

impl LightingConfig {
    /// Create a lighting configuration with defaults
    pub fn new() -> Self {
        Self {
            max_radius: 256.0,
            sprite_max_lights: 5,
            model_max_lights: 4,
            glow_height_factor: 3.0,
            glow_height_max: 100.0,
            distance_attenuation: 1024.0,
            light_range_compression: 0.0,
            ambient_light: 0,
            attenuate_torch: true,
            level_full_bright: false,
        }
    }

    /// Set the light collection radius
    pub fn with_max_radius(mut self, radius: f32) -> Self {
        self.max_radius = radius;
        self
    }

    /// Set the ambient floor
    pub fn with_ambient_light(mut self, ambient: u8) -> Self {
        self.ambient_light = ambient;
        self
    }

    /// Set light range compression
    pub fn with_range_compression(mut self, compression: f32) -> Self {
        self.light_range_compression = compression;
        self
    }

    /// Render everything full bright
    pub fn with_full_bright(mut self, enabled: bool) -> Self {
        self.level_full_bright = enabled;
        self
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Weapon Configuration
///
/// Placement and lighting of first-person weapon sprites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    /// Degrees of model rotation per unit of sprite offset
    pub offset_scale: f32,
    /// Vertical offset scale in thousandths
    pub offset_scale_y: f32,
    /// Pitch shift applied as the field of view widens past 90 degrees
    pub fov_shift: f32,
    /// Extra screen offset for 2D weapon sprites
    pub offset: [f32; 2],
    /// Multiplier for the region light level of 2D weapon sprites
    pub light_multiplier: f32,
}

impl WeaponConfig {
    /// Create a weapon configuration with defaults
    pub fn new() -> Self {
        Self {
            offset_scale: 0.3183,
            offset_scale_y: 1000.0,
            fov_shift: 45.0,
            offset: [0.0, 0.0],
            light_multiplier: 1.0,
        }
    }

    /// Vertical scale as a plain multiplier
    pub fn vertical_scale(&self) -> f32 {
        self.offset_scale_y / 1000.0
    }
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Halo Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaloConfig {
    /// Flare size adjustment in `[0, 100]`
    pub halo_size: u32,
    /// Halo mode; values above 1 enable the secondary halo pass
    pub halo_mode: u32,
}

impl HaloConfig {
    /// Create a halo configuration with defaults
    pub fn new() -> Self {
        Self {
            halo_size: 50,
            halo_mode: 5,
        }
    }

    /// Scale applied to raw flare sizes
    pub fn size_scale(&self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let size = self.halo_size as f32;
        60.0 * (50.0 + size) / 100.0
    }

    /// Whether the secondary halo pass runs
    pub const fn secondary_pass(&self) -> bool {
        self.halo_mode > 1
    }
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Render Configuration
///
/// Top-level configuration for the sprite pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Capacity of the per-frame vissprite buffer
    pub max_vissprites: usize,
    /// Sprite projection settings
    pub sprites: SpriteConfig,
    /// Light binding settings
    pub lighting: LightingConfig,
    /// First-person weapon settings
    pub weapons: WeaponConfig,
    /// Flare settings
    pub halos: HaloConfig,
}

impl RenderConfig {
    /// Default capacity of the per-frame vissprite buffer
    pub const DEFAULT_MAX_VISSPRITES: usize = 8192;

    /// Create a render configuration with defaults
    pub fn new() -> Self {
        Self {
            max_vissprites: Self::DEFAULT_MAX_VISSPRITES,
            sprites: SpriteConfig::default(),
            lighting: LightingConfig::default(),
            weapons: WeaponConfig::default(),
            halos: HaloConfig::default(),
        }
    }

    /// Replace the sprite section
    pub fn with_sprites(mut self, sprites: SpriteConfig) -> Self {
        self.sprites = sprites;
        self
    }

    /// Replace the lighting section
    pub fn with_lighting(mut self, lighting: LightingConfig) -> Self {
        self.lighting = lighting;
        self
    }

    /// Set the vissprite capacity
    pub fn with_max_vissprites(mut self, capacity: usize) -> Self {
        self.max_vissprites = capacity;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_vissprites == 0 {
            return Err(ConfigError::Invalid("max_vissprites must be at least 1".to_string()));
        }
        if self.sprites.use_srvo > 2 {
            return Err(ConfigError::Invalid(format!(
                "use_srvo must be 0, 1 or 2, got {}",
                self.sprites.use_srvo
            )));
        }
        if !(-1.0..=1.0).contains(&self.lighting.light_range_compression) {
            return Err(ConfigError::Invalid(format!(
                "light_range_compression must be within [-1, 1], got {}",
                self.lighting.light_range_compression
            )));
        }
        if self.lighting.max_radius <= 0.0 {
            return Err(ConfigError::Invalid("max_radius must be positive".to_string()));
        }
        if self.lighting.distance_attenuation < 0.0 {
            return Err(ConfigError::Invalid("distance_attenuation cannot be negative".to_string()));
        }
        if self.halos.halo_size > 100 {
            return Err(ConfigError::Invalid(format!(
                "halo_size must be within [0, 100], got {}",
                self.halos.halo_size
            )));
        }
        Ok(())
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for RenderConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_vissprites, 8192);
        assert_eq!(config.lighting.sprite_max_lights, 5);
        assert!(config.halos.secondary_pass());
    }

    #[test]
    fn test_validate_rejects_bad_compression() {
        let config = RenderConfig::default()
            .with_lighting(LightingConfig::default().with_range_compression(2.0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = "max_vissprites = 16\n[sprites]\nuse_srvo = 1\n";
        let config = RenderConfig::parse(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.max_vissprites, 16);
        assert_eq!(config.sprites.use_srvo, 1);
        assert!(config.sprites.use_models);
        assert_eq!(config.lighting, LightingConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let config = RenderConfig::default()
            .with_sprites(SpriteConfig::default().with_alignment(SpriteAlignment::ViewPlane));
        let text = config.to_text(ConfigFormat::Ron).unwrap();
        let parsed = RenderConfig::parse(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_format_follows_extension() {
        use std::path::Path;

        assert_eq!(ConfigFormat::from_path(Path::new("maps/e1m1.TOML")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("render.ron")).unwrap(), ConfigFormat::Ron);
        let result = RenderConfig::load_from_file("render.ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
