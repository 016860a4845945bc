//! Scene-side interfaces consumed by the sprite pipeline
//!
//! The pipeline never owns map data. Regions, light sources, sprite
//! resources and model definitions are reached through the traits in this
//! module so the same projection code runs against a live map or the
//! in-memory scene used by tests.

use std::ops::ControlFlow;

use bitflags::bitflags;

use crate::foundation::math::{BinaryAngle, Rgb, Vec2, Vec3};

/// Material handle resolved by the resource layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MaterialId(pub u32);

/// Map region (sector) handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RegionId(pub u32);

/// 3D model definition handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ModelId(pub u32);

/// Animation state handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StateId(pub u32);

/// World object handle; also seeds bobbing and spin phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u32);

/// Flare texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FlareTextureId(pub u32);

slotmap::new_key_type! {
    /// Handle of a registered light source
    pub struct LightSourceId;
}

/// Physical and visual plane heights of a region.
///
/// Visual heights differ from physical ones while planes are being smoothed
/// between game tics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionPlanes {
    /// Physical floor height
    pub floor: f32,
    /// Physical ceiling height
    pub ceiling: f32,
    /// Smoothed floor height
    pub visual_floor: f32,
    /// Smoothed ceiling height
    pub visual_ceiling: f32,
}

impl RegionPlanes {
    /// Planes with matching physical and visual heights
    pub const fn flat(floor: f32, ceiling: f32) -> Self {
        Self {
            floor,
            ceiling,
            visual_floor: floor,
            visual_ceiling: ceiling,
        }
    }

    /// A region with no visible height cannot hold a visible object
    pub fn is_degenerate(&self) -> bool {
        self.visual_floor >= self.visual_ceiling
    }
}

/// Region lookups needed for placement and ambient light
pub trait RegionQuery {
    /// Plane heights of `region`
    fn planes(&self, region: RegionId) -> RegionPlanes;

    /// Scalar light level of `region` in `[0, 1]`
    fn light_level(&self, region: RegionId) -> f32;

    /// Light color of `region`
    fn light_color(&self, region: RegionId) -> Rgb;

    /// Whether the ceiling of `region` is open sky
    fn ceiling_is_sky(&self, region: RegionId) -> bool;

    /// Ambient color from a precomputed light grid, when one exists
    fn light_grid(&self, _point: Vec3) -> Option<Rgb> {
        None
    }

    /// Visit every region touched by a circle on the map plane
    fn for_each_touching_region(&self, center: Vec2, radius: f32, f: &mut dyn FnMut(RegionId));
}

/// Shape-specific light source data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSourceKind {
    /// Point light
    Omni {
        /// Falloff radius
        radius: f32,
        /// Height of the light above its origin
        z_offset: f32,
    },
    /// Glowing plane (floor or ceiling)
    Plane {
        /// Plane normal, pointing into the open space
        normal: Vec3,
        /// Glow strength in `[0, 1]`
        intensity: f32,
    },
}

/// A luminous source registered with the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    /// Origin; for planes a point on the plane
    pub origin: Vec3,
    /// Light color
    pub color: Rgb,
    /// Source shape
    pub kind: LightSourceKind,
}

impl LightSource {
    /// Point light
    pub fn omni(origin: Vec3, color: Rgb, radius: f32) -> Self {
        Self {
            origin,
            color,
            kind: LightSourceKind::Omni { radius, z_offset: 0.0 },
        }
    }

    /// Glowing plane
    pub fn plane(origin: Vec3, color: Rgb, normal: Vec3, intensity: f32) -> Self {
        Self {
            origin,
            color,
            kind: LightSourceKind::Plane { normal, intensity },
        }
    }

    /// Height of the light above its origin; zero for planes
    pub fn z_offset(&self) -> f32 {
        match self.kind {
            LightSourceKind::Omni { z_offset, .. } => z_offset,
            LightSourceKind::Plane { .. } => 0.0,
        }
    }
}

/// Spatial registry of light sources
pub trait LightSourceRegistry {
    /// Visit sources whose origin lies within `radius` of `center` on the
    /// map plane; stop when the callback breaks
    fn for_each_in_radius(
        &self,
        center: Vec3,
        radius: f32,
        f: &mut dyn FnMut(LightSourceId, &LightSource) -> ControlFlow<()>,
    );

    /// Look up a source by handle
    fn get(&self, id: LightSourceId) -> Option<&LightSource>;
}

/// Resource namespace a material's primary texture belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceNamespace {
    /// Sprite patches
    Sprites,
    /// Wall textures
    Textures,
    /// Flat textures
    Flats,
    /// Engine-provided textures
    System,
}

/// Result of the automatic brightness analysis of a sprite texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoLightAnalysis {
    /// Horizontal origin of the bright area as a fraction of the width
    pub origin_x: f32,
    /// Brightness multiplier used as the base flare size
    pub bright_mul: f32,
    /// Average color of the bright area
    pub color: Rgb,
}

impl Default for AutoLightAnalysis {
    fn default() -> Self {
        Self {
            origin_x: 0.5,
            bright_mul: 1.0,
            color: Rgb::new(1.0, 1.0, 1.0),
        }
    }
}

/// Prepared material properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialInfo {
    /// Width in world units, border included
    pub width: f32,
    /// Height in world units, border included
    pub height: f32,
    /// Horizontal patch offset
    pub offset_x: f32,
    /// Vertical patch offset (top of the patch above the origin)
    pub offset_y: f32,
    /// Namespace of the primary texture
    pub namespace: ResourceNamespace,
    /// Texture coordinate of the bottom-right corner
    pub tex_coord: [f32; 2],
    /// Brightness analysis used for flares
    pub auto_light: AutoLightAnalysis,
}

impl MaterialInfo {
    /// Sprite material of the given size with its origin at the bottom center
    pub fn sprite(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            offset_x: width / 2.0,
            offset_y: height,
            namespace: ResourceNamespace::Sprites,
            tex_coord: [1.0, 1.0],
            auto_light: AutoLightAnalysis::default(),
        }
    }
}

/// A declared sprite-namespace resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteResource {
    /// Lump-style name, e.g. `TROOA2A8`
    pub name: String,
    /// Material the name resolves to
    pub material: MaterialId,
}

impl SpriteResource {
    /// Create a resource record
    pub fn new(name: impl Into<String>, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            material,
        }
    }
}

/// Sprite resources and material information
pub trait SpriteResources {
    /// Every declared sprite-namespace resource, in declaration order
    fn sprite_resources(&self) -> Vec<SpriteResource>;

    /// Fixed legacy sprite name table; position is the legacy sprite number
    fn legacy_sprite_names(&self) -> &[String];

    /// Prepared properties of a material
    fn material(&self, id: MaterialId) -> Option<MaterialInfo>;
}

bitflags! {
    /// Per-object render flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u32 {
        /// Never drawn
        const DONT_DRAW = 1 << 0;
        /// Always faces the view plane
        const VIEW_ALIGN = 1 << 1;
        /// Additive, 80% alpha
        const BRIGHT_SHADOW = 1 << 2;
        /// 33% alpha
        const SHADOW = 1 << 3;
        /// 66% alpha
        const ALT_SHADOW = 1 << 4;
        /// Clamp the sprite top to the ceiling
        const FIT_TOP = 1 << 5;
        /// Do not raise the sprite out of the floor
        const NO_FIT_BOTTOM = 1 << 6;
        /// Floats up and down
        const BOB = 1 << 7;
        /// Position comes from a remote smoother
        const REMOTE = 1 << 8;
    }
}

bitflags! {
    /// Animation state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u32 {
        /// State is drawn full bright
        const FULL_BRIGHT = 1 << 0;
    }
}

bitflags! {
    /// Model definition flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModelFlags: u32 {
        /// Yaw faces the viewer
        const ALIGN_YAW = 1 << 0;
        /// Pitch faces the viewer
        const ALIGN_PITCH = 1 << 1;
        /// Yaw spins with map time
        const SPIN = 1 << 2;
        /// Yaw follows momentum
        const MOVEMENT_YAW = 1 << 3;
        /// Pitch follows momentum
        const MOVEMENT_PITCH = 1 << 4;
        /// Add a per-object yaw offset
        const ID_ANGLE = 1 << 5;
        /// Never swapped for a sprite by distance
        const NO_DISTANCE_CHECK = 1 << 6;
        /// Not lit full bright even in full-bright states
        const DIM = 1 << 7;
    }
}

bitflags! {
    /// Flare rendering flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FlareFlags: u32 {
        /// Skip the primary flare; only the secondary halo is drawn
        const NO_PRIMARY = 1 << 0;
        /// The flare does not turn with the view
        const NO_TURN = 1 << 1;
    }
}

/// Flare texture selection for a state light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlareTexture {
    /// Chosen by the halo renderer from the flare size
    #[default]
    Automatic,
    /// No primary flare
    Disabled,
    /// A specific flare texture
    Texture(FlareTextureId),
}

/// Light definition attached to an animation state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateLight {
    /// Flare size override; 0 keeps the analysed size
    pub size: f32,
    /// Halo radius override; 0 keeps the size
    pub halo_radius: f32,
    /// Horizontal flare offset override; 0 keeps the analysed offset
    pub offset_x: f32,
    /// Flare flags
    pub flags: FlareFlags,
    /// Flare texture
    pub flare: FlareTexture,
}

impl Default for StateLight {
    fn default() -> Self {
        Self {
            size: 0.0,
            halo_radius: 0.0,
            offset_x: 0.0,
            flags: FlareFlags::empty(),
            flare: FlareTexture::Automatic,
        }
    }
}

/// Current animation state of an object or weapon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimState {
    /// State handle, used for model lookups
    pub id: StateId,
    /// Sprite number in the frame table
    pub sprite: usize,
    /// Animation frame
    pub frame: usize,
    /// Duration of the state in tics
    pub tics: i32,
    /// State flags
    pub flags: StateFlags,
    /// Light definition, if any
    pub light: Option<StateLight>,
}

impl AnimState {
    /// State showing `frame` of `sprite`
    pub fn new(id: StateId, sprite: usize, frame: usize) -> Self {
        Self {
            id,
            sprite,
            frame,
            tics: 4,
            flags: StateFlags::empty(),
            light: None,
        }
    }

    /// Mark the state full bright
    pub fn full_bright(mut self) -> Self {
        self.flags |= StateFlags::FULL_BRIGHT;
        self
    }

    /// Whether the state is drawn full bright
    pub fn is_full_bright(&self) -> bool {
        self.flags.contains(StateFlags::FULL_BRIGHT)
    }
}

/// A movable world object as seen by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Object handle
    pub id: ObjectId,
    /// Physical position
    pub position: Vec3,
    /// Smoothed position for remotely driven objects
    pub smoothed_position: Option<Vec3>,
    /// Facing
    pub heading: BinaryAngle,
    /// Smoothed facing
    pub visual_heading: BinaryAngle,
    /// Velocity per tic
    pub momentum: Vec3,
    /// Short-range visual offset at the start of the state
    pub srvo: Vec3,
    /// Physical height
    pub height: f32,
    /// Physical radius
    pub radius: f32,
    /// Foot clip depth
    pub floor_clip: f32,
    /// Region containing the origin
    pub region: RegionId,
    /// Current animation state
    pub state: Option<AnimState>,
    /// Tics left in the current state
    pub tics: i32,
    /// Render flags
    pub flags: ObjectFlags,
    /// Model selector; the top bits of the shifted value carry alpha
    pub selector: u32,
    /// Translucency, 0 opaque to 255 invisible
    pub translucency: u8,
    /// Luminous source attached to the object
    pub attached_light: Option<LightSourceId>,
    /// Smoothed flare occlusion, low 7 bits used
    pub halo_factor: u8,
    /// Camera objects are never drawn into the sky fix
    pub is_camera: bool,
}

impl SceneObject {
    /// Bits the selector is shifted by before reading alpha bits
    pub const SELECTOR_SHIFT: u32 = 24;

    /// Object with default properties at `position`
    pub fn new(id: ObjectId, position: Vec3, region: RegionId) -> Self {
        Self {
            id,
            position,
            smoothed_position: None,
            heading: BinaryAngle(0),
            visual_heading: BinaryAngle(0),
            momentum: Vec3::zeros(),
            srvo: Vec3::zeros(),
            height: 56.0,
            radius: 20.0,
            floor_clip: 0.0,
            region,
            state: None,
            tics: 0,
            flags: ObjectFlags::empty(),
            selector: 0,
            translucency: 0,
            attached_light: None,
            halo_factor: 0x7f,
            is_camera: false,
        }
    }

    /// Set the animation state and reset its tic counter
    pub fn with_state(mut self, state: AnimState) -> Self {
        self.tics = state.tics;
        self.state = Some(state);
        self
    }

    /// Add render flags
    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the facing
    pub fn with_heading(mut self, heading: BinaryAngle) -> Self {
        self.heading = heading;
        self.visual_heading = heading;
        self
    }

    /// Position used for rendering
    pub fn render_position(&self) -> Vec3 {
        match self.smoothed_position {
            Some(smoothed) if self.flags.contains(ObjectFlags::REMOTE) => smoothed,
            _ => self.position,
        }
    }
}

/// Model chosen for the current state of an object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSelection {
    /// Model for the current frame
    pub model: ModelId,
    /// Model to interpolate towards
    pub next: Option<ModelId>,
    /// Interpolation fraction in `[0, 1]`
    pub inter: f32,
    /// Flags of the first submodel
    pub flags: ModelFlags,
    /// Radius used for visibility checks
    pub visual_radius: f32,
}

/// Model substitution for animation states
pub trait ModelRegistry {
    /// Model to draw for `state` with `tics` remaining, if any
    fn model_for(&self, state: &AnimState, tics: i32, selector: u32) -> Option<ModelSelection>;
}

/// Torch carried by the viewer (fixed colormap)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Torch {
    /// Fixed colormap, 1 brightest to 16 darkest
    pub colormap: u8,
    /// Torch color
    pub color: Rgb,
    /// Add the torch color instead of tinting
    pub additive: bool,
}

/// Camera state for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Eye position
    pub position: Vec3,
    /// View yaw
    pub angle: BinaryAngle,
    /// View pitch in degrees
    pub pitch: f32,
    /// Horizontal field of view in degrees
    pub fov: f32,
    /// Fraction of the current tic elapsed, `[0, 1)`
    pub frame_time: f32,
    /// Map time in seconds
    pub map_time: f32,
    /// Extra light delta added to region levels
    pub extra_light: f32,
    /// Active torch
    pub torch: Option<Torch>,
    /// Running a network game; disables smoothed model yaw
    pub net_game: bool,
}

impl ViewState {
    /// View at `position` looking along `angle`
    pub fn new(position: Vec3, angle: BinaryAngle) -> Self {
        Self {
            position,
            angle,
            pitch: 0.0,
            fov: 90.0,
            frame_time: 0.0,
            map_time: 0.0,
            extra_light: 0.0,
            torch: None,
            net_game: false,
        }
    }

    /// Unit view direction on the map plane
    pub fn front(&self) -> Vec2 {
        self.angle.direction()
    }

    /// Depth of `point` along the view direction
    pub fn point_distance(&self, point: Vec3) -> f32 {
        let delta = point.xy() - self.position.xy();
        delta.dot(&self.front()).abs()
    }
}

/// Screen-space occlusion test for view-relative segments
pub trait Occlusion {
    /// Whether any part of the segment `from`-`to` is still visible
    fn is_segment_visible(&self, from: Vec2, to: Vec2) -> bool;
}

/// A first-person weapon slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponSprite {
    /// Current state; empty slots are skipped
    pub state: Option<AnimState>,
    /// Tics left in the state
    pub tics: i32,
    /// Screen offset of the sprite
    pub position: Vec2,
    /// Opacity
    pub alpha: f32,
    /// Slot is drawn full bright
    pub full_bright: bool,
}

/// The player the view belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPlayer {
    /// Region containing the player
    pub region: RegionId,
    /// Cameramen have no weapon sprites
    pub is_camera: bool,
    /// Weapon slots
    pub weapons: Vec<WeaponSprite>,
}

/// Borrowed bundle of the scene interfaces a frame needs
#[derive(Clone, Copy)]
pub struct SceneInterfaces<'a> {
    /// Region lookups
    pub regions: &'a dyn RegionQuery,
    /// Light source registry
    pub lights: &'a dyn LightSourceRegistry,
    /// Sprite resources and materials
    pub resources: &'a dyn SpriteResources,
    /// Model substitution
    pub models: &'a dyn ModelRegistry,
    /// Occlusion test
    pub occlusion: &'a dyn Occlusion,
}
