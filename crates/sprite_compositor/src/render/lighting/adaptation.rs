//! Light level adjustments: range compression, distance falloff and torch

use crate::core::config::LightingConfig;
use crate::foundation::math::Rgb;
use crate::render::api::scene::Torch;

const TABLE_SIZE: usize = 255;

/// Distance at which the torch stops having any effect
pub const TORCH_RANGE: f32 = 1024.0;

/// Light adaptation curve.
///
/// Maps a light level to the delta that range compression and the ambient
/// floor add to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LightAdaptation {
    deltas: [f32; TABLE_SIZE],
}

impl LightAdaptation {
    /// Build the curve for a compression in `[-1, 1]` and an ambient floor
    pub fn new(compression: f32, ambient: u8) -> Self {
        let ambient = f32::from(ambient);
        let mut deltas = [0.0; TABLE_SIZE];

        for (i, delta) in deltas.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let level = i as f32;

            let mut adjust = if compression >= 0.0 {
                // Brighten dark areas
                (255.0 - level) * compression
            } else {
                // Darken bright areas
                -level * -compression
            };

            if ambient != 0.0 && level + adjust <= ambient {
                adjust = ambient - level;
            }

            if level + adjust >= 255.0 {
                adjust = 255.0 - level;
            } else if level + adjust <= 0.0 {
                adjust = -level;
            }

            *delta = adjust / 255.0;
        }

        Self { deltas }
    }

    /// Build the curve for a map; the higher of the map and configured ambient wins
    pub fn for_map(config: &LightingConfig, map_ambient: u8) -> Self {
        Self::new(
            config.light_range_compression,
            map_ambient.max(config.ambient_light),
        )
    }

    /// Delta for a light level in `[0, 1]`
    pub fn delta(&self, level: f32) -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        let index = (255.0 * level).round().clamp(0.0, (TABLE_SIZE - 1) as f32) as usize;
        self.deltas[index]
    }

    /// Level with its delta applied
    pub fn apply(&self, level: f32) -> f32 {
        level + self.delta(level)
    }
}

impl Default for LightAdaptation {
    fn default() -> Self {
        Self::new(0.0, 0)
    }
}

/// Darken a light level with distance from the viewer.
///
/// The result never drops below `level² + (level - 0.63) / 2`.
pub fn attenuate_light_level(distance: f32, level: f32, attenuation: f32) -> f32 {
    if distance > 0.0 && attenuation > 0.0 {
        let real = level - (distance - 32.0) / attenuation * (1.0 - level);
        let minimum = level * level + (level - 0.63) * 0.5;
        real.max(minimum)
    } else {
        level
    }
}

/// Apply the viewer's torch to an ambient color
pub fn apply_torch(color: &mut Rgb, distance: f32, torch: &Torch, attenuate: bool) {
    if torch.colormap == 0 || (attenuate && distance >= TORCH_RANGE) {
        return;
    }

    // Colormap 1 is the brightest
    let mut strength = (16.0 - f32::from(torch.colormap)) / 15.0;
    if attenuate {
        strength *= (TORCH_RANGE - distance) / TORCH_RANGE;
    }

    if torch.additive {
        *color += torch.color * strength;
    } else {
        let tinted = color.component_mul(&torch.color);
        *color += (tinted - *color) * strength;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_neutral_curve_has_no_effect() {
        let curve = LightAdaptation::default();
        for level in [0.0, 0.25, 0.5, 1.0] {
            assert_relative_eq!(curve.apply(level), level);
        }
    }

    #[test]
    fn test_ambient_floor_raises_dark_levels() {
        let curve = LightAdaptation::new(0.0, 128);
        assert_relative_eq!(curve.apply(0.0), 128.0 / 255.0);
        assert_relative_eq!(curve.apply(1.0), 1.0);
    }

    #[test]
    fn test_map_ambient_and_config_floor_take_the_higher() {
        let mut config = LightingConfig::default();
        let curve = LightAdaptation::for_map(&config, 96);
        assert_relative_eq!(curve.apply(0.0), 96.0 / 255.0);

        config.ambient_light = 160;
        let curve = LightAdaptation::for_map(&config, 96);
        assert_relative_eq!(curve.apply(0.0), 160.0 / 255.0);
    }

    #[test]
    fn test_compression_brightens_dark_areas() {
        let curve = LightAdaptation::new(0.5, 0);
        assert_relative_eq!(curve.delta(0.0), 0.5);
        assert!(curve.delta(0.9) < curve.delta(0.1));
    }

    #[test]
    fn test_attenuation_floor() {
        // Far away the floor takes over
        let far = attenuate_light_level(100_000.0, 0.8, 1024.0);
        assert_relative_eq!(far, 0.8 * 0.8 + (0.8 - 0.63) * 0.5);
        // Disabled attenuation keeps the level
        assert_relative_eq!(attenuate_light_level(500.0, 0.5, 0.0), 0.5);
        // Close to the viewer the level rises slightly
        assert!(attenuate_light_level(16.0, 0.5, 1024.0) > 0.5);
    }

    #[test]
    fn test_additive_torch() {
        let torch = Torch {
            colormap: 1,
            color: Rgb::new(1.0, 0.5, 0.0),
            additive: true,
        };
        let mut color = Rgb::new(0.1, 0.1, 0.1);
        apply_torch(&mut color, 0.0, &torch, true);
        assert_relative_eq!(color, Rgb::new(1.1, 0.6, 0.1));

        let mut unchanged = Rgb::new(0.1, 0.1, 0.1);
        apply_torch(&mut unchanged, TORCH_RANGE, &torch, true);
        assert_relative_eq!(unchanged, Rgb::new(0.1, 0.1, 0.1));
    }
}
