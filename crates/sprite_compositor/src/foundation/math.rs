//! Math utilities and types
//!
//! World space is Z-up: X and Y span the map plane, Z is height. Facing
//! angles are binary angle measurements (BAMS) so that octant selection is
//! exact integer arithmetic.

pub use nalgebra::{Vector2, Vector3, Vector4};

/// 2D vector type (map plane)
pub type Vec2 = Vector2<f32>;

/// 3D vector type (Z-up world space)
pub type Vec3 = Vector3<f32>;

/// Linear RGB color
pub type Rgb = Vector3<f32>;

/// Linear RGBA color
pub type Rgba = Vector4<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;
}

/// Math utility functions
pub mod utils {
    /// Cheap octagonal distance estimate, within ~8% of the Euclidean length.
    pub fn approx_distance(dx: f32, dy: f32) -> f32 {
        let dx = dx.abs();
        let dy = dy.abs();
        dx + dy - dx.min(dy) / 2.0
    }
}

/// Binary angle measurement: the full circle maps onto the `u32` range so
/// angle arithmetic wraps for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BinaryAngle(pub u32);

impl BinaryAngle {
    /// 45 degrees
    pub const ANG45: u32 = 0x2000_0000;
    /// 90 degrees
    pub const ANG90: u32 = 0x4000_0000;
    /// 180 degrees
    pub const ANG180: u32 = 0x8000_0000;

    const FULL_CIRCLE: f64 = 4_294_967_296.0;

    /// Angle from radians (any range; wrapped)
    pub fn from_radians(radians: f32) -> Self {
        Self::from_turns(f64::from(radians) / std::f64::consts::TAU)
    }

    /// Angle from degrees (any range; wrapped)
    pub fn from_degrees(degrees: f32) -> Self {
        Self::from_turns(f64::from(degrees) / 360.0)
    }

    /// Direction of the vector `(dx, dy)`; zero vector yields angle 0.
    pub fn between(dx: f32, dy: f32) -> Self {
        if dx == 0.0 && dy == 0.0 {
            return Self(0);
        }
        Self::from_turns(f64::from(dy).atan2(f64::from(dx)) / std::f64::consts::TAU)
    }

    fn from_turns(turns: f64) -> Self {
        let turns = turns.rem_euclid(1.0);
        // `turns * 2^32` can round up to exactly 2^32, which wraps to 0.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw = (turns * Self::FULL_CIRCLE).round() as u64;
        #[allow(clippy::cast_possible_truncation)]
        Self(raw as u32)
    }

    /// Angle in radians within `[0, 2π)`
    pub fn to_radians(self) -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        let r = (f64::from(self.0) / Self::FULL_CIRCLE * std::f64::consts::TAU) as f32;
        r
    }

    /// Angle in degrees within `[0, 360)`
    pub fn to_degrees(self) -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        let d = (f64::from(self.0) / Self::FULL_CIRCLE * 360.0) as f32;
        d
    }

    /// Fraction of a full turn within `[0, 1)`
    pub fn turns(self) -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        let t = (f64::from(self.0) / Self::FULL_CIRCLE) as f32;
        t
    }

    /// Wrapping addition
    #[must_use]
    pub const fn wrapping_add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }

    /// Wrapping subtraction
    #[must_use]
    pub const fn wrapping_sub(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }

    /// Unit direction on the map plane
    pub fn direction(self) -> Vec2 {
        let r = self.to_radians();
        Vec2::new(r.cos(), r.sin())
    }
}

/// Yaw in degrees of a momentum vector on the map plane.
pub fn movement_yaw(mom_x: f32, mom_y: f32) -> f32 {
    // Scale up for some artificial accuracy with tiny momenta.
    BinaryAngle::between(100.0 * mom_x, -100.0 * mom_y).to_degrees()
}

/// Pitch in degrees of a 3D momentum vector.
pub fn movement_pitch(mom_x: f32, mom_y: f32, mom_z: f32) -> f32 {
    let horizontal = Vec2::new(mom_x, mom_y).norm();
    BinaryAngle::between(100.0 * horizontal, 100.0 * mom_z).to_degrees()
}
