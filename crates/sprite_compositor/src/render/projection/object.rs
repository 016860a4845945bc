//! World object projection
//!
//! Turns each visible [`SceneObject`] into a sprite or model vissprite,
//! plus a flare when the object carries a luminous source.

use crate::core::config::RenderConfig;
use crate::foundation::logging::trace;
use crate::foundation::math::{constants, movement_pitch, movement_yaw, utils, BinaryAngle, Rgba, Vec3};
use crate::render::api::scene::{
    AnimState, FlareFlags, FlareTexture, LightSource, MaterialInfo, ModelFlags, ModelSelection,
    ObjectFlags, RegionId, RegionPlanes, SceneInterfaces, SceneObject, ViewState,
};
use crate::render::frame::FrameContext;
use crate::render::lighting::{BindRequest, DynamicLightBinder, LightAdaptation};
use crate::render::projection::placement::{
    bob_offset, fit_sprite_top, object_alpha, short_range_offset, snap_to_visual_planes,
    sprite_blend, srvo_applies, view_relative_line, FLOOR_ADJUST_LIMIT, MAX_OBJECT_RADIUS,
};
use crate::render::sprites::{sprite_octant, SpriteFrame, SpriteFrameTable};
use crate::render::vissprite::{FlareParams, ModelParams, SpriteParams, VisPayload, VisSprite};

/// Smallest flare size after scaling
const MIN_FLARE_SIZE: f32 = 8.0;

/// Spin rate of `SPIN` models in degrees per second of map time
const SPIN_RATE: f32 = 70.0;

/// Why an object produced no vissprite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Flagged never to be drawn
    DontDraw,
    /// No animation state
    NoState,
    /// Its region has no visible height
    DegenerateRegion,
    /// Fully transparent
    Transparent,
    /// Sprite or frame not in the frame table
    FrameOutOfRange,
    /// Material unknown to the resource layer
    MissingMaterial,
    /// Hidden by already drawn geometry
    Occluded,
    /// Already projected this frame
    AlreadyProjected,
    /// The vissprite buffer is full
    Overflow,
}

/// What was drawn in place of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectedKind {
    /// A camera-facing sprite
    Sprite,
    /// A 3D model
    Model,
}

/// Result of projecting one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// A vissprite was stored
    Projected {
        /// Sprite or model
        kind: ProjectedKind,
        /// A flare record was stored as well
        flare: bool,
    },
    /// Nothing was stored
    Skipped(SkipReason),
}

impl ProjectionOutcome {
    /// Whether a vissprite was stored
    pub const fn is_projected(&self) -> bool {
        matches!(self, Self::Projected { .. })
    }
}

/// Counts of a projection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionSummary {
    /// Sprites stored
    pub sprites: usize,
    /// Models stored
    pub models: usize,
    /// Flares stored
    pub flares: usize,
    /// Objects that produced nothing
    pub skipped: usize,
}

impl ProjectionSummary {
    fn record(&mut self, outcome: ProjectionOutcome) {
        match outcome {
            ProjectionOutcome::Projected { kind, flare } => {
                match kind {
                    ProjectedKind::Sprite => self.sprites += 1,
                    ProjectedKind::Model => self.models += 1,
                }
                if flare {
                    self.flares += 1;
                }
            }
            ProjectionOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Everything resolved about an object before its record is built
struct Placement<'m> {
    state: AnimState,
    frame: &'m SpriteFrame,
    planes: RegionPlanes,
    alpha: f32,
    position: Vec3,
    distance: f32,
    model: Option<ModelSelection>,
    octant: usize,
    material: MaterialInfo,
    srvo: Vec3,
}

/// Projects world objects into the frame's vissprite buffer
pub struct VisibleObjectProjector<'a> {
    scene: SceneInterfaces<'a>,
    table: &'a SpriteFrameTable,
    view: &'a ViewState,
    config: &'a RenderConfig,
    binder: DynamicLightBinder<'a>,
}

impl<'a> VisibleObjectProjector<'a> {
    /// Create a projector for one frame
    pub fn new(
        scene: SceneInterfaces<'a>,
        table: &'a SpriteFrameTable,
        view: &'a ViewState,
        adaptation: &'a LightAdaptation,
        config: &'a RenderConfig,
    ) -> Self {
        Self {
            scene,
            table,
            view,
            config,
            binder: DynamicLightBinder::new(
                scene.regions,
                scene.lights,
                view,
                adaptation,
                &config.lighting,
            ),
        }
    }

    pub(crate) const fn scene(&self) -> SceneInterfaces<'a> {
        self.scene
    }

    pub(crate) const fn table(&self) -> &'a SpriteFrameTable {
        self.table
    }

    pub(crate) const fn view(&self) -> &'a ViewState {
        self.view
    }

    pub(crate) const fn config(&self) -> &'a RenderConfig {
        self.config
    }

    pub(crate) const fn binder(&self) -> &DynamicLightBinder<'a> {
        &self.binder
    }

    /// Project every object in its own region
    pub fn project_objects(&self, frame: &mut FrameContext, objects: &[SceneObject]) -> ProjectionSummary {
        let mut summary = ProjectionSummary::default();
        for object in objects {
            self.apply_sky_fix(frame, object.region, object);
            summary.record(self.project_object(frame, object));
        }
        summary
    }

    /// Project the objects linked into `region`.
    ///
    /// The sky fix is applied against `region` for every object; an object
    /// linked into several regions is projected only once per frame.
    pub fn project_region(
        &self,
        frame: &mut FrameContext,
        region: RegionId,
        objects: &[SceneObject],
    ) -> ProjectionSummary {
        let mut summary = ProjectionSummary::default();
        for object in objects {
            self.apply_sky_fix(frame, region, object);
            summary.record(self.project_object(frame, object));
        }
        summary
    }

    /// Raise the frame's sky fix for an object standing under an open sky
    pub fn apply_sky_fix(&self, frame: &mut FrameContext, region: RegionId, object: &SceneObject) {
        let Some(state) = object.state else {
            return;
        };
        if object.is_camera || !self.scene.regions.ceiling_is_sky(region) {
            return;
        }
        let planes = self.scene.regions.planes(region);
        let z = object.position.z;
        if z < planes.floor || z > planes.ceiling {
            return;
        }
        let Some(material) = self
            .table
            .material_for(state.sprite, state.frame)
            .and_then(|id| self.scene.resources.material(id))
        else {
            return;
        };
        if frame.raise_sky_fix(z + material.height) {
            trace!("Sky fix raised to {} by object {:?}", frame.sky_fix_ceiling(), object.id);
        }
    }

    /// Project one object
    pub fn project_object(&self, frame: &mut FrameContext, object: &SceneObject) -> ProjectionOutcome {
        if !frame.mark_projected(object.id) {
            return ProjectionOutcome::Skipped(SkipReason::AlreadyProjected);
        }

        let placement = match self.resolve(object) {
            Ok(placement) => placement,
            Err(reason) => {
                trace!("Object {:?} skipped: {:?}", object.id, reason);
                return ProjectionOutcome::Skipped(reason);
            }
        };

        let (record, kind) = match placement.model {
            Some(model) => (self.model_record(frame, object, &placement, model), ProjectedKind::Model),
            None => (self.sprite_record(frame, object, &placement), ProjectedKind::Sprite),
        };
        if frame.push_vissprite(record).is_none() {
            return ProjectionOutcome::Skipped(SkipReason::Overflow);
        }

        let flare = match self.flare_record(object, &placement) {
            Some(flare) => frame.push_vissprite(flare).is_some(),
            None => false,
        };
        ProjectionOutcome::Projected { kind, flare }
    }

    fn resolve<'t>(&'t self, object: &SceneObject) -> Result<Placement<'t>, SkipReason> {
        if object.flags.contains(ObjectFlags::DONT_DRAW) {
            return Err(SkipReason::DontDraw);
        }
        let state = object.state.ok_or(SkipReason::NoState)?;

        let planes = self.scene.regions.planes(object.region);
        if planes.is_degenerate() {
            return Err(SkipReason::DegenerateRegion);
        }

        let alpha = object_alpha(object);
        if alpha <= 0.0 {
            return Err(SkipReason::Transparent);
        }

        let frame = self
            .table
            .frame(state.sprite, state.frame)
            .ok_or(SkipReason::FrameOutOfRange)?;

        let position = object.render_position();
        let distance = self.view.point_distance(position);

        let sprites = &self.config.sprites;
        let model = if sprites.use_models {
            self.scene
                .models
                .model_for(&state, object.tics, object.selector)
                .filter(|model| {
                    model.flags.contains(ModelFlags::NO_DISTANCE_CHECK)
                        || sprites.max_model_distance == 0.0
                        || distance <= sprites.max_model_distance
                })
        } else {
            None
        };

        let octant = if frame.rotate && model.is_none() {
            self.octant_of(object, position)
        } else {
            0
        };
        let (material_id, _) = frame.view(octant);
        let material = self
            .scene
            .resources
            .material(material_id)
            .ok_or(SkipReason::MissingMaterial)?;

        let srvo = if srvo_applies(sprites.use_srvo, model.is_some()) {
            short_range_offset(object, &state, self.view.frame_time)
        } else {
            Vec3::zeros()
        };

        let placement = Placement {
            state,
            frame,
            planes,
            alpha,
            position,
            distance,
            model,
            octant,
            material,
            srvo,
        };

        if !self.is_visible(object, &placement) {
            return Err(SkipReason::Occluded);
        }
        Ok(placement)
    }

    fn octant_of(&self, object: &SceneObject, position: Vec3) -> usize {
        let rel = position.xy() - self.view.position.xy();
        sprite_octant(BinaryAngle::between(rel.x, rel.y), object.heading)
    }

    fn is_view_aligned(&self, object: &SceneObject) -> bool {
        object.flags.contains(ObjectFlags::VIEW_ALIGN)
            || self.config.sprites.always_align.forces_view_aligned()
    }

    fn is_visible(&self, object: &SceneObject, placement: &Placement<'_>) -> bool {
        let visual_radius = placement
            .model
            .map(|model| model.visual_radius)
            .filter(|radius| *radius > 0.0)
            .or_else(|| (placement.material.width > 0.0).then_some(placement.material.width / 2.0))
            .unwrap_or(object.radius);
        let width = visual_radius * 2.0;
        let offset = if placement.model.is_some() {
            0.0
        } else {
            placement.material.offset_x - width / 2.0
        };

        let aligned = placement.model.is_some()
            || self.is_view_aligned(object)
            || self.config.sprites.always_align.projects_along_view_plane();
        let (start, end) = view_relative_line(placement.position.xy(), width, offset, self.view, aligned);
        let eye = self.view.position.xy();
        if self.scene.occlusion.is_segment_visible(start - eye, end - eye) {
            return true;
        }

        // Models close to the eye may poke out of the clipped range.
        placement.model.is_some()
            && utils::approx_distance(
                placement.distance,
                placement.position.z + object.height / 2.0 - self.view.position.z,
            ) <= MAX_OBJECT_RADIUS
    }

    /// Center height after snapping to the visual planes of every touched region
    fn placed_z(&self, object: &SceneObject, placement: &Placement<'_>) -> (f32, bool) {
        let planes = &placement.planes;
        let floor_adjust = (planes.visual_floor - planes.floor).abs() < FLOOR_ADJUST_LIMIT;

        let z = placement.position.z;
        let regions = self.scene.regions;
        let mut placed = z;
        let mut touched = false;
        regions.for_each_touching_region(placement.position.xy(), object.radius, &mut |region| {
            touched = true;
            placed = snap_to_visual_planes(placed, z, object.height, floor_adjust, &regions.planes(region));
        });
        if !touched {
            placed = snap_to_visual_planes(placed, z, object.height, floor_adjust, planes);
        }
        (placed, floor_adjust)
    }

    fn is_full_bright(&self, state: &AnimState) -> bool {
        state.is_full_bright() || self.config.lighting.level_full_bright
    }

    fn ambient_alpha(&self, alpha: f32) -> f32 {
        if self.config.sprites.use_sprite_alpha {
            alpha
        } else {
            1.0
        }
    }

    fn sprite_record(&self, frame: &mut FrameContext, object: &SceneObject, placement: &Placement<'_>) -> VisSprite {
        let material = &placement.material;
        let (material_id, flip) = placement.frame.view(placement.octant);
        let (z, floor_adjust) = self.placed_z(object, placement);

        let floor_clip = object.floor_clip + bob_offset(object, self.view.map_time);
        let gzt = fit_sprite_top(z + material.offset_y, material.height, &placement.planes, object.flags, floor_adjust)
            - floor_clip;

        let center = Vec3::new(placement.position.x, placement.position.y, gzt - material.height / 2.0);
        let full_bright = self.is_full_bright(&placement.state);
        let binding = self.binder.bind(
            frame.lights_mut(),
            &BindRequest::world(center, object.region, placement.distance, full_bright),
        );

        let sprites = &self.config.sprites;
        let params = SpriteParams {
            material: material_id,
            flip: [flip, false],
            blend: sprite_blend(object.flags, placement.alpha, sprites),
            width: material.width,
            height: material.height,
            tex_coord: material.tex_coord,
            gzt,
            view_offset: material.offset_x - material.width / 2.0,
            floor_clip,
            srvo: placement.srvo,
            ambient: Rgba::new(
                binding.ambient.x,
                binding.ambient.y,
                binding.ambient.z,
                self.ambient_alpha(placement.alpha),
            ),
            lights: binding.handle,
            view_aligned: self.is_view_aligned(object),
            no_z_write: sprites.no_sprite_z_write,
        };

        trace!(
            "Object {:?} as sprite {} frame {} octant {} at distance {:.1}",
            object.id,
            placement.state.sprite,
            placement.state.frame,
            placement.octant,
            placement.distance
        );
        VisSprite {
            center,
            distance: placement.distance,
            payload: VisPayload::Sprite(params),
        }
    }

    fn model_record(
        &self,
        frame: &mut FrameContext,
        object: &SceneObject,
        placement: &Placement<'_>,
        model: ModelSelection,
    ) -> VisSprite {
        let (z, _) = self.placed_z(object, placement);
        let gzt = z + placement.material.offset_y;
        let floor_clip = object.floor_clip + bob_offset(object, self.view.map_time);
        let mut srvo = placement.srvo;
        srvo.z -= floor_clip;

        let center = Vec3::new(placement.position.x, placement.position.y, z);
        let full_bright = self.is_full_bright(&placement.state) && !model.flags.contains(ModelFlags::DIM);
        let binding = self.binder.bind(
            frame.lights_mut(),
            &BindRequest::world(
                center + Vec3::new(0.0, 0.0, object.height / 2.0),
                object.region,
                placement.distance,
                full_bright,
            ),
        );

        let params = ModelParams {
            model: model.model,
            next: model.next,
            inter: model.inter,
            object: Some(object.id),
            yaw: self.model_yaw(object, placement, model.flags),
            pitch: self.model_pitch(object, placement, model.flags, z, gzt),
            yaw_offset: 0.0,
            pitch_offset: 0.0,
            srvo,
            gzt,
            ambient: Rgba::new(
                binding.ambient.x,
                binding.ambient.y,
                binding.ambient.z,
                self.ambient_alpha(placement.alpha),
            ),
            lights: binding.handle,
            full_bright,
            view_aligned: false,
        };

        trace!(
            "Object {:?} as model {:?} at distance {:.1}",
            object.id,
            model.model,
            placement.distance
        );
        VisSprite {
            center,
            distance: placement.distance,
            payload: VisPayload::Model(params),
        }
    }

    fn model_yaw(&self, object: &SceneObject, placement: &Placement<'_>, flags: ModelFlags) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let id_angle = (object.id.0 % 360) as f32;
        let sprites = &self.config.sprites;

        let mut yaw = if flags.contains(ModelFlags::ALIGN_YAW) {
            let rel = placement.position.xy() - self.view.position.xy();
            let thangle =
                BinaryAngle::between(rel.x * 10.0, rel.y * 10.0).to_radians() - constants::PI / 2.0;
            90.0 - thangle / constants::PI * 180.0
        } else if flags.contains(ModelFlags::SPIN) {
            sprites.model_spin_speed * SPIN_RATE * self.view.map_time + id_angle
        } else if flags.contains(ModelFlags::MOVEMENT_YAW) {
            movement_yaw(object.momentum.x, object.momentum.y)
        } else {
            let heading = if sprites.use_srvo_angle && !self.view.net_game {
                object.visual_heading
            } else {
                object.heading
            };
            heading.turns() * -360.0
        };

        if flags.contains(ModelFlags::ID_ANGLE) {
            yaw += id_angle;
        }
        yaw
    }

    fn model_pitch(
        &self,
        object: &SceneObject,
        placement: &Placement<'_>,
        flags: ModelFlags,
        z: f32,
        gzt: f32,
    ) -> f32 {
        if flags.contains(ModelFlags::ALIGN_PITCH) {
            let height = (z + gzt) / 2.0 - self.view.position.z;
            -BinaryAngle::between(placement.distance * 10.0, height * 10.0).to_degrees()
        } else if flags.contains(ModelFlags::MOVEMENT_PITCH) {
            movement_pitch(object.momentum.x, object.momentum.y, object.momentum.z)
        } else {
            0.0
        }
    }

    fn flare_record(&self, object: &SceneObject, placement: &Placement<'_>) -> Option<VisSprite> {
        let source: &LightSource = self.scene.lights.get(object.attached_light?)?;

        // The flare follows the sprite frame even when a model is drawn.
        let octant = if placement.frame.rotate {
            self.octant_of(object, placement.position)
        } else {
            0
        };
        let (material_id, _) = placement.frame.view(octant);
        let material = self.scene.resources.material(material_id)?;
        let analysis = material.auto_light;

        let mut size = analysis.bright_mul;
        let mut x_offset = material.width * analysis.origin_x - material.offset_x;
        let mut flags = FlareFlags::empty();
        let mut texture = FlareTexture::Automatic;
        if let Some(light) = placement.state.light {
            if light.size != 0.0 {
                size = light.size;
            }
            if light.halo_radius != 0.0 {
                size = light.halo_radius;
            }
            if light.offset_x != 0.0 {
                x_offset = light.offset_x;
            }
            flags = light.flags;
            if light.flare == FlareTexture::Disabled {
                flags |= FlareFlags::NO_PRIMARY;
            }
            texture = light.flare;
        }
        size = (size * self.config.halos.size_scale()).max(MIN_FLARE_SIZE);

        let center = placement.position + placement.srvo + Vec3::new(0.0, 0.0, source.z_offset());
        Some(VisSprite {
            center,
            distance: placement.distance,
            payload: VisPayload::Flare(FlareParams {
                size,
                color: source.color,
                texture,
                x_offset,
                flags,
                factor: object.halo_factor,
                multiplier: 1.0,
            }),
        })
    }
}
