//! Back-to-front masked compositing
//!
//! The compositor walks the frame's sorted vissprites once and turns each
//! record into backend draw calls. Light lists are resolved into vertex
//! colors (sprites) or light slices (models) here; the backend only ever
//! sees final geometry.

use std::ops::ControlFlow;

use crate::core::config::{RenderConfig, SpriteAlignment};
use crate::foundation::logging::{debug, error};
use crate::foundation::math::{Rgb, Rgba, Vec2, Vec3};
use crate::render::api::render_backend::{
    BackendResult, BlendMode, DrawBackend, HaloDraw, ModelDraw, QuadRotation, SpriteQuad,
    VertexColor, WeaponQuad,
};
use crate::render::api::scene::{FlareFlags, ResourceNamespace, SpriteResources, ViewState};
use crate::render::frame::FrameContext;
use crate::render::lighting::{LightListHandle, LightLists, LightNode};
use crate::render::projection::placement::{sprite_side_direction, OPAQUE_ALPHA};
use crate::render::vissprite::{
    FlareParams, ModelParams, SpriteParams, VisPayload, VisSprite, WeaponRecord, WeaponSpriteParams,
};

/// Color of a surface with normal `normal` under the lights of `handle`.
///
/// Lights affected by ambient accumulate into one channel that is floored
/// by `ambient`; the rest add on top. At most `max_lights` lights are
/// applied, 0 meaning all of them. Alpha is taken from `ambient`.
pub fn light_vertex(
    normal: &Vec3,
    lights: &LightLists,
    handle: LightListHandle,
    ambient: &Rgba,
    max_lights: usize,
) -> Rgba {
    let mut color = Rgb::zeros();
    let mut extra = Rgb::zeros();
    let mut processed = 0;

    lights.for_each(handle, |light| {
        let mut dot = light.direction.dot(normal) + light.offset;
        dot *= if dot > 0.0 { light.light_side } else { light.dark_side };
        let dot = dot.clamp(-1.0, 1.0);

        if light.affected_by_ambient {
            color += light.color * dot;
        } else {
            extra += light.color * dot;
        }

        processed += 1;
        if max_lights != 0 && processed >= max_lights {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    let channel = |i: usize| (color[i].max(ambient[i]) + extra[i]).clamp(0.0, 1.0);
    Rgba::new(channel(0), channel(1), channel(2), ambient.w)
}

/// Colors for the four corners of a flat quad
pub fn vertex_colors(
    normal: &Vec3,
    lights: &LightLists,
    handle: LightListHandle,
    ambient: &Rgba,
    max_lights: usize,
) -> [VertexColor; 4] {
    let color = if handle.is_none() {
        *ambient
    } else {
        light_vertex(normal, lights, handle, ambient, max_lights)
    };
    [VertexColor::from_rgba(&color); 4]
}

/// Counts of one compositing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Sprites drawn
    pub sprites: usize,
    /// Models drawn
    pub models: usize,
    /// Masked walls drawn
    pub masked_walls: usize,
    /// Primary flares the backend reported as drawn
    pub flares: usize,
    /// Records skipped for invalid materials
    pub rejected: usize,
    /// Whether the secondary halo pass ran
    pub halo_pass: bool,
}

/// Issues draw calls for a frame's records
///
/// Model light slices are gathered into `scratch`, which the caller owns so
/// its capacity carries over from frame to frame.
pub struct Compositor<'a> {
    view: &'a ViewState,
    config: &'a RenderConfig,
    resources: &'a dyn SpriteResources,
    scratch: &'a mut Vec<LightNode>,
}

impl<'a> Compositor<'a> {
    /// Create a compositor for one frame
    pub fn new(
        view: &'a ViewState,
        config: &'a RenderConfig,
        resources: &'a dyn SpriteResources,
        scratch: &'a mut Vec<LightNode>,
    ) -> Self {
        Self {
            view,
            config,
            resources,
            scratch,
        }
    }

    /// Draw every sorted vissprite, farthest first, then the secondary
    /// halo pass.
    pub fn draw_masked(&mut self, frame: &FrameContext, backend: &mut dyn DrawBackend) -> BackendResult<CompositeStats> {
        let mut stats = CompositeStats::default();

        for record in frame.sorted() {
            match &record.payload {
                VisPayload::MaskedWall(wall) => {
                    backend.draw_masked_wall(wall)?;
                    stats.masked_walls += 1;
                }
                VisPayload::Sprite(params) => {
                    if self.draw_sprite(frame.lights(), record, params, backend)? {
                        stats.sprites += 1;
                    } else {
                        stats.rejected += 1;
                    }
                }
                VisPayload::Model(params) => {
                    self.collect_model_lights(frame.lights(), params);
                    let draw = self.model_draw(record.center, record.distance, params);
                    backend.draw_model(&draw)?;
                    stats.models += 1;
                }
                VisPayload::Flare(params) => {
                    if !params.flags.contains(FlareFlags::NO_PRIMARY)
                        && backend.draw_halo(&halo_draw(record, params), true)?
                    {
                        stats.flares += 1;
                    }
                }
            }
        }

        if stats.flares > 0 && self.config.halos.secondary_pass() {
            backend.set_halo_pass(true)?;
            for record in frame.sorted() {
                if let VisPayload::Flare(params) = &record.payload {
                    backend.draw_halo(&halo_draw(record, params), false)?;
                }
            }
            backend.set_halo_pass(false)?;
            stats.halo_pass = true;
        }

        debug!(
            "Masked pass: {} sprite(s), {} model(s), {} wall(s), {} flare(s)",
            stats.sprites, stats.models, stats.masked_walls, stats.flares
        );
        Ok(stats)
    }

    /// Draw first-person weapons: models first, then 2D sprites
    pub fn draw_weapons(&mut self, frame: &FrameContext, backend: &mut dyn DrawBackend) -> BackendResult<usize> {
        let mut drawn = 0;
        for record in frame.weapons() {
            if let WeaponRecord::Model { center, params } = record {
                self.collect_model_lights(frame.lights(), params);
                let draw = self.model_draw(*center, 0.0, params);
                backend.draw_weapon_model(&draw)?;
                drawn += 1;
            }
        }
        for record in frame.weapons() {
            if let WeaponRecord::Sprite(params) = record {
                backend.draw_weapon_sprite(&self.weapon_quad(frame.lights(), params))?;
                drawn += 1;
            }
        }
        Ok(drawn)
    }

    fn draw_sprite(
        &self,
        lights: &LightLists,
        record: &VisSprite,
        params: &SpriteParams,
        backend: &mut dyn DrawBackend,
    ) -> BackendResult<bool> {
        let namespace = self.resources.material(params.material).map(|m| m.namespace);
        debug_assert_eq!(
            namespace,
            Some(ResourceNamespace::Sprites),
            "sprite material {:?} is not a sprite",
            params.material
        );
        if namespace != Some(ResourceNamespace::Sprites) {
            error!("Sprite material {:?} is not in the sprite namespace; skipped", params.material);
            return Ok(false);
        }

        let quad = self.sprite_quad(lights, record, params);
        backend.draw_sprite_quad(&quad)?;
        Ok(true)
    }

    /// Geometry, colors and state for a world sprite
    fn sprite_quad(&self, lights: &LightLists, record: &VisSprite, params: &SpriteParams) -> SpriteQuad {
        let center = record.center + params.srvo;
        let align = self.config.sprites.always_align;
        let along_view_plane = params.view_aligned || align.projects_along_view_plane();
        let side = sprite_side_direction(center.xy(), self.view, along_view_plane);

        let start = center.xy() - side * (params.width / 2.0 + params.view_offset);
        let end = start + side * params.width;
        let bottom = center.z - params.height / 2.0;
        let top = center.z + params.height / 2.0;
        let vertices = [
            Vec3::new(start.x, start.y, bottom),
            Vec3::new(start.x, start.y, top),
            Vec3::new(end.x, end.y, top),
            Vec3::new(end.x, end.y, bottom),
        ];

        let normal = self.facing_normal(side, center);
        let colors = vertex_colors(
            &normal,
            lights,
            params.lights,
            &params.ambient,
            self.config.lighting.sprite_max_lights,
        );

        let depth_write = !params.no_z_write
            && params.ambient.w >= OPAQUE_ALPHA
            && matches!(params.blend, BlendMode::Normal | BlendMode::ZeroAlpha);

        SpriteQuad {
            vertices,
            normal,
            colors,
            tex_coords: quad_tex_coords(params.tex_coord, params.flip),
            material: params.material,
            blend: params.blend,
            depth_write,
            rotation: self.sprite_rotation(params.view_aligned, align, side),
            center,
        }
    }

    /// Horizontal normal of a quad along `side`, facing the eye
    fn facing_normal(&self, side: Vec2, center: Vec3) -> Vec3 {
        let normal = Vec3::new(-side.y, side.x, 0.0);
        let to_eye = self.view.position - center;
        if normal.dot(&to_eye) < 0.0 {
            -normal
        } else {
            normal
        }
    }

    fn sprite_rotation(&self, view_aligned: bool, align: SpriteAlignment, axis: Vec2) -> QuadRotation {
        let pitch = self.view.pitch;
        if view_aligned || align == SpriteAlignment::ViewPlane {
            return QuadRotation::ViewPlane { pitch, axis };
        }
        if align == SpriteAlignment::Camera {
            let max = self.config.sprites.max_sprite_angle;
            if pitch.abs() > max {
                let angle = if pitch < 0.0 { pitch + max } else { pitch - max };
                return QuadRotation::Camera { angle, axis };
            }
        }
        QuadRotation::None
    }

    fn collect_model_lights(&mut self, lights: &LightLists, params: &ModelParams) {
        self.scratch.clear();
        if params.full_bright {
            return;
        }
        let max = self.config.lighting.model_max_lights;
        let scratch = &mut *self.scratch;
        lights.for_each(params.lights, |light| {
            scratch.push(*light);
            if max != 0 && scratch.len() >= max {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
    }

    fn model_draw(&self, center: Vec3, distance: f32, params: &ModelParams) -> ModelDraw<'_> {
        ModelDraw {
            model: params.model,
            next: params.next,
            inter: params.inter,
            center,
            srvo: params.srvo,
            gzt: params.gzt,
            distance,
            yaw: params.yaw,
            yaw_offset: params.yaw_offset,
            pitch: params.pitch,
            pitch_offset: params.pitch_offset,
            view_aligned: params.view_aligned,
            ambient: params.ambient,
            lights: self.scratch.as_slice(),
        }
    }

    fn weapon_quad(&self, lights: &LightLists, params: &WeaponSpriteParams) -> WeaponQuad {
        let front = self.view.front();
        let pitch = self.view.pitch.to_radians();
        let normal = Vec3::new(front.x * pitch.cos(), front.y * pitch.cos(), pitch.sin());
        let colors = vertex_colors(
            &normal,
            lights,
            params.lights,
            &params.ambient,
            self.config.lighting.sprite_max_lights,
        );

        let [s, t] = params.tex_coord;
        let (s0, s1) = if params.flip { (s, 0.0) } else { (0.0, s) };
        WeaponQuad {
            position: params.position,
            width: params.width,
            height: params.height,
            colors,
            tex_coords: [[s0, 0.0], [s1, 0.0], [s1, t], [s0, t]],
            material: params.material,
        }
    }
}

/// Texture coordinates for bottom-left, top-left, top-right, bottom-right
fn quad_tex_coords(tex_coord: [f32; 2], flip: [bool; 2]) -> [[f32; 2]; 4] {
    let [s, t] = tex_coord;
    let (s0, s1) = if flip[0] { (s, 0.0) } else { (0.0, s) };
    let (t_top, t_bottom) = if flip[1] { (t, 0.0) } else { (0.0, t) };
    [[s0, t_bottom], [s0, t_top], [s1, t_top], [s1, t_bottom]]
}

fn halo_draw(record: &VisSprite, params: &FlareParams) -> HaloDraw {
    HaloDraw {
        center: record.center,
        size: params.size,
        texture: params.texture,
        color: params.color,
        distance: record.distance,
        occlusion: params.occlusion(),
        multiplier: params.multiplier,
        x_offset: params.x_offset,
        flags: params.flags,
    }
}
