//! Placement helpers shared by object and weapon projection

use crate::core::config::SpriteConfig;
use crate::foundation::math::{constants, BinaryAngle, Vec2, Vec3};
use crate::render::api::render_backend::BlendMode;
use crate::render::api::scene::{AnimState, ObjectFlags, RegionPlanes, SceneObject, ViewState};

/// Momentum below this on every axis counts as standing still
pub const NO_MOMENTUM_THRESHOLD: f32 = 1e-6;

/// Culled models closer than this to the eye are still drawn
pub const MAX_OBJECT_RADIUS: f32 = 128.0;

/// Visual floors further than this from the physical floor are not snapped to
pub const FLOOR_ADJUST_LIMIT: f32 = 8.0;

/// Alpha at or above which a sprite counts as opaque
pub const OPAQUE_ALPHA: f32 = 0.98;

const BOB_PERIOD: f32 = 1.8286;
const BOB_HEIGHT: f32 = 8.0;

/// Opacity of an object from its flags, selector and translucency
pub fn object_alpha(object: &SceneObject) -> f32 {
    let mut alpha = if object.flags.contains(ObjectFlags::BRIGHT_SHADOW) {
        0.8
    } else if object.flags.contains(ObjectFlags::SHADOW) {
        0.33
    } else if object.flags.contains(ObjectFlags::ALT_SHADOW) {
        0.66
    } else {
        1.0
    };

    let selector_alpha = object.selector >> SceneObject::SELECTOR_SHIFT;
    if selector_alpha & 0xe0 != 0 {
        #[allow(clippy::cast_precision_loss)]
        let eighths = ((selector_alpha & 0xe0) >> 5) as f32;
        alpha *= 1.0 - eighths / 8.0;
    } else if object.translucency != 0 {
        alpha *= 1.0 - f32::from(object.translucency) / 255.0;
    }
    alpha
}

/// Blend mode for a sprite of the given opacity
pub fn sprite_blend(flags: ObjectFlags, alpha: f32, config: &SpriteConfig) -> BlendMode {
    if !config.use_sprite_blend {
        BlendMode::Normal
    } else if flags.contains(ObjectFlags::BRIGHT_SHADOW) {
        BlendMode::Add
    } else if config.no_sprite_trans && alpha >= OPAQUE_ALPHA {
        BlendMode::ZeroAlpha
    } else {
        BlendMode::Normal
    }
}

/// Vertical bobbing offset of a floating object
pub fn bob_offset(object: &SceneObject, map_time: f32) -> f32 {
    if !object.flags.contains(ObjectFlags::BOB) {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let phase = object.id.0 as f32;
    (phase + map_time / BOB_PERIOD * constants::TAU).sin() * BOB_HEIGHT
}

/// Short-range visual offset: the smoothing offset left over from the
/// last state change plus the momentum covered since the last tic.
pub fn short_range_offset(object: &SceneObject, state: &AnimState, frame_time: f32) -> Vec3 {
    let mut offset = Vec3::zeros();
    if object.tics >= 0 && state.tics > 0 {
        #[allow(clippy::cast_precision_loss)]
        let remaining = (object.tics as f32 - frame_time) / state.tics as f32;
        offset = object.srvo * remaining;
    }
    if object.momentum.iter().any(|m| m.abs() > NO_MOMENTUM_THRESHOLD) {
        offset += object.momentum * frame_time;
    }
    offset
}

/// Whether the SRVO applies at the configured level
pub const fn srvo_applies(use_srvo: u8, is_model: bool) -> bool {
    if is_model {
        use_srvo > 0
    } else {
        use_srvo > 1
    }
}

/// Horizontal direction of a sprite's surface, left to right as seen
/// from the eye.
pub fn sprite_side_direction(center: Vec2, view: &ViewState, align_to_view_plane: bool) -> Vec2 {
    if align_to_view_plane {
        let front = view.front();
        return Vec2::new(front.y, -front.x);
    }
    let rel = center - view.position.xy();
    let angle = BinaryAngle::between(rel.x * 10.0, rel.y * 10.0).to_radians() - constants::PI / 2.0;
    Vec2::new(angle.cos(), angle.sin())
}

/// Endpoints of a `width` wide segment through `center`, shifted along
/// the segment by `offset`.
pub fn view_relative_line(
    center: Vec2,
    width: f32,
    offset: f32,
    view: &ViewState,
    align_to_view_plane: bool,
) -> (Vec2, Vec2) {
    let side = sprite_side_direction(center, view, align_to_view_plane);
    let start = center - side * (width / 2.0 + offset);
    (start, start + side * width)
}

/// Snap an object's height to the visual planes of one touched region.
///
/// `placed` is the height chosen so far; it is returned unchanged unless the
/// object rests on this region's physical floor or hangs from its ceiling.
/// Objects resting on a physical floor follow the smoothed floor; objects
/// touching a physical ceiling hang from the smoothed ceiling.
#[allow(clippy::float_cmp)]
pub fn snap_to_visual_planes(placed: f32, z: f32, height: f32, floor_adjust: bool, planes: &RegionPlanes) -> f32 {
    let mut snapped = placed;
    if floor_adjust && z == planes.floor {
        snapped = planes.visual_floor;
    }
    if z + height == planes.ceiling {
        snapped = planes.visual_ceiling - height;
    }
    snapped
}

/// Keep a sprite of `height` between the visual floor and ceiling.
///
/// Returns the adjusted top. Sprites taller than the gap are left alone.
pub fn fit_sprite_top(
    gzt: f32,
    height: f32,
    planes: &RegionPlanes,
    flags: ObjectFlags,
    floor_adjust: bool,
) -> f32 {
    let mut top = gzt;
    if height < planes.visual_ceiling - planes.visual_floor {
        if flags.contains(ObjectFlags::FIT_TOP) && top > planes.visual_ceiling {
            top = planes.visual_ceiling;
        }
        if floor_adjust && !flags.contains(ObjectFlags::NO_FIT_BOTTOM) && top - height < planes.visual_floor {
            top = planes.visual_floor + height;
        }
    }
    top
}
