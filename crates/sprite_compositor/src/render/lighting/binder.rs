//! Dynamic light binding
//!
//! For every lit point the binder samples an ambient color, wraps it in a
//! synthetic "world light" and collects nearby light sources into a
//! distance-sorted list stored in the frame's [`LightLists`].

use std::ops::ControlFlow;

use crate::core::config::LightingConfig;
use crate::foundation::logging::trace;
use crate::foundation::math::{Rgb, Vec3};
use crate::render::api::scene::{
    LightSource, LightSourceKind, LightSourceRegistry, RegionId, RegionQuery, ViewState,
};
use crate::render::lighting::adaptation::{apply_torch, attenuate_light_level, LightAdaptation};
use crate::render::lighting::light_list::{LightListHandle, LightLists, LightNode};

/// Direction of the synthetic world light
pub const WORLD_LIGHT_DIRECTION: [f32; 3] = [-0.400_891, -0.200_445, 0.601_336];

/// Base height of a glowing plane before scaling
pub const GLOW_HEIGHT_MAX: f32 = 100.0;

/// Omni lights dimmer than this are ignored
const MIN_OMNI_INTENSITY: f32 = 0.05;

/// What to light and how its ambient is sampled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindRequest {
    /// Point being lit
    pub point: Vec3,
    /// Region containing the point
    pub region: RegionId,
    /// Skip lighting entirely and use white
    pub full_bright: bool,
    /// Camera distance, for attenuation and the torch
    pub distance: f32,
    /// Darken the region level with distance
    pub attenuate: bool,
    /// Multiplier applied to the region level after the extra light
    pub level_multiplier: f32,
    /// Use the high-contrast world light weights
    pub stark: bool,
}

impl BindRequest {
    /// A world sprite or model
    pub fn world(point: Vec3, region: RegionId, distance: f32, full_bright: bool) -> Self {
        Self {
            point,
            region,
            full_bright,
            distance,
            attenuate: true,
            level_multiplier: 1.0,
            stark: false,
        }
    }

    /// A 2D first-person weapon sprite
    pub fn weapon_sprite(point: Vec3, region: RegionId, full_bright: bool, multiplier: f32) -> Self {
        Self {
            point,
            region,
            full_bright,
            distance: 0.0,
            attenuate: false,
            level_multiplier: multiplier,
            stark: false,
        }
    }

    /// A first-person weapon model
    pub fn weapon_model(point: Vec3, region: RegionId, full_bright: bool) -> Self {
        Self {
            point,
            region,
            full_bright,
            distance: 0.0,
            attenuate: false,
            level_multiplier: 1.0,
            stark: true,
        }
    }
}

/// Ambient color and light list for one lit point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBinding {
    /// Ambient color
    pub ambient: Rgb,
    /// Light list; [`LightListHandle::NONE`] when full bright
    pub handle: LightListHandle,
}

impl LightBinding {
    /// Binding for full-bright objects
    pub fn full_bright() -> Self {
        Self {
            ambient: Rgb::new(1.0, 1.0, 1.0),
            handle: LightListHandle::NONE,
        }
    }
}

/// Collects the lights affecting points for one frame
pub struct DynamicLightBinder<'a> {
    regions: &'a dyn RegionQuery,
    sources: &'a dyn LightSourceRegistry,
    view: &'a ViewState,
    adaptation: &'a LightAdaptation,
    config: &'a LightingConfig,
}

impl<'a> DynamicLightBinder<'a> {
    /// Create a binder over the frame's scene and settings
    pub fn new(
        regions: &'a dyn RegionQuery,
        sources: &'a dyn LightSourceRegistry,
        view: &'a ViewState,
        adaptation: &'a LightAdaptation,
        config: &'a LightingConfig,
    ) -> Self {
        Self {
            regions,
            sources,
            view,
            adaptation,
            config,
        }
    }

    /// Sample the ambient color and collect lights for a point
    pub fn bind(&self, lists: &mut LightLists, request: &BindRequest) -> LightBinding {
        if request.full_bright {
            return LightBinding::full_bright();
        }

        let ambient = self.sample_ambient(request);
        let handle = self.collect_affecting_lights(lists, request.point, ambient, request.stark);
        LightBinding { ambient, handle }
    }

    /// Ambient color at a point, torch included
    pub fn sample_ambient(&self, request: &BindRequest) -> Rgb {
        let mut color = match self.regions.light_grid(request.point) {
            Some(color) => color,
            None => {
                let mut level = self.regions.light_level(request.region);
                if request.attenuate {
                    level = attenuate_light_level(
                        request.distance,
                        level,
                        self.config.distance_attenuation,
                    );
                }
                level += self.view.extra_light;
                level *= request.level_multiplier;
                level = self.adaptation.apply(level);
                self.regions.light_color(request.region) * level
            }
        };

        if let Some(torch) = &self.view.torch {
            apply_torch(&mut color, request.distance, torch, self.config.attenuate_torch);
        }
        color
    }

    /// Start a sorted light list with the world light and every nearby source
    pub fn collect_affecting_lights(
        &self,
        lists: &mut LightLists,
        point: Vec3,
        ambient: Rgb,
        stark: bool,
    ) -> LightListHandle {
        let handle = lists.new_list(true);
        lists.push(handle, world_light(ambient, stark));

        let mut accepted = 0_usize;
        self.sources
            .for_each_in_radius(point, self.config.max_radius, &mut |_, source| {
                if let Some(node) = self.light_for_source(point, source) {
                    lists.push(handle, node);
                    accepted += 1;
                }
                ControlFlow::Continue(())
            });

        trace!(
            "Bound {} dynamic light(s) at ({:.1}, {:.1}, {:.1})",
            accepted,
            point.x,
            point.y,
            point.z
        );
        handle
    }

    /// How a source affects `point`, if at all
    fn light_for_source(&self, point: Vec3, source: &LightSource) -> Option<LightNode> {
        match source.kind {
            LightSourceKind::Omni { radius, z_offset } => {
                let to_light = source.origin + Vec3::new(0.0, 0.0, z_offset) - point;
                let dist = to_light.norm();
                if dist >= self.config.max_radius || radius <= 0.0 {
                    return None;
                }

                let intensity = ((1.0 - dist / radius) * 2.0).clamp(0.0, 1.0);
                if intensity <= MIN_OMNI_INTENSITY {
                    return None;
                }

                let direction = if dist > 0.0 { to_light / dist } else { Vec3::zeros() };
                Some(LightNode {
                    direction,
                    color: source.color * intensity,
                    approx_dist: dist,
                    affected_by_ambient: true,
                    light_side: 1.0,
                    dark_side: 0.0,
                    offset: 0.0,
                })
            }
            LightSourceKind::Plane { normal, intensity } => {
                if intensity <= 0.0 || source.color.iter().all(|c| *c <= 0.0) {
                    return None;
                }

                let glow_height = GLOW_HEIGHT_MAX * intensity * self.config.glow_height_factor;
                if glow_height <= 2.0 {
                    return None;
                }
                let glow_height = glow_height.min(self.config.glow_height_max);

                let dist = (point - source.origin).dot(&normal);
                if dist < 0.0 {
                    // Behind the plane
                    return None;
                }

                let strength = 1.0 - dist / glow_height;
                if strength <= 0.0 {
                    return None;
                }

                Some(LightNode {
                    direction: Vec3::new(normal.x, normal.y, -normal.z),
                    color: source.color * strength,
                    approx_dist: dist,
                    affected_by_ambient: true,
                    light_side: 1.0,
                    dark_side: 0.0,
                    offset: 0.3,
                })
            }
        }
    }
}

/// The synthetic light carrying a point's ambient color
pub fn world_light(ambient: Rgb, stark: bool) -> LightNode {
    let (light_side, dark_side, offset) = if stark { (0.35, 0.5, 0.0) } else { (0.2, 0.8, 0.3) };
    LightNode {
        direction: Vec3::from(WORLD_LIGHT_DIRECTION),
        color: ambient,
        approx_dist: 0.0,
        affected_by_ambient: false,
        light_side,
        dark_side,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::scene::{LightSourceId, RegionPlanes};
    use crate::foundation::math::Vec2;
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    struct OneRegion {
        level: f32,
        grid: Option<Rgb>,
    }

    impl RegionQuery for OneRegion {
        fn planes(&self, _region: RegionId) -> RegionPlanes {
            RegionPlanes::flat(0.0, 128.0)
        }
        fn light_level(&self, _region: RegionId) -> f32 {
            self.level
        }
        fn light_color(&self, _region: RegionId) -> Rgb {
            Rgb::new(1.0, 0.5, 1.0)
        }
        fn ceiling_is_sky(&self, _region: RegionId) -> bool {
            false
        }
        fn light_grid(&self, _point: Vec3) -> Option<Rgb> {
            self.grid
        }
        fn for_each_touching_region(&self, _center: Vec2, _radius: f32, f: &mut dyn FnMut(RegionId)) {
            f(RegionId(0));
        }
    }

    #[derive(Default)]
    struct Sources(SlotMap<LightSourceId, LightSource>);

    impl LightSourceRegistry for Sources {
        fn for_each_in_radius(
            &self,
            _center: Vec3,
            _radius: f32,
            f: &mut dyn FnMut(LightSourceId, &LightSource) -> ControlFlow<()>,
        ) {
            for (id, source) in &self.0 {
                if f(id, source).is_break() {
                    return;
                }
            }
        }

        fn get(&self, id: LightSourceId) -> Option<&LightSource> {
            self.0.get(id)
        }
    }

    struct Fixture {
        region: OneRegion,
        sources: Sources,
        view: ViewState,
        adaptation: LightAdaptation,
        config: LightingConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                region: OneRegion { level: 0.5, grid: None },
                sources: Sources::default(),
                view: ViewState::new(Vec3::zeros(), Default::default()),
                adaptation: LightAdaptation::default(),
                config: LightingConfig::default(),
            }
        }

        fn binder(&self) -> DynamicLightBinder<'_> {
            DynamicLightBinder::new(
                &self.region,
                &self.sources,
                &self.view,
                &self.adaptation,
                &self.config,
            )
        }
    }

    #[test]
    fn test_full_bright_skips_lights() {
        let fixture = Fixture::new();
        let mut lists = LightLists::new();
        let request = BindRequest::world(Vec3::new(100.0, 0.0, 0.0), RegionId(0), 100.0, true);

        let binding = fixture.binder().bind(&mut lists, &request);
        assert!(binding.handle.is_none());
        assert_eq!(binding.ambient, Rgb::new(1.0, 1.0, 1.0));
        assert_eq!(lists.list_count(), 0);
    }

    #[test]
    fn test_region_level_is_tinted() {
        let fixture = Fixture::new();
        let request = BindRequest::weapon_sprite(Vec3::zeros(), RegionId(0), false, 1.0);
        let ambient = fixture.binder().sample_ambient(&request);
        assert_relative_eq!(ambient, Rgb::new(0.5, 0.25, 0.5));
    }

    #[test]
    fn test_light_grid_overrides_region_level() {
        let mut fixture = Fixture::new();
        fixture.region.grid = Some(Rgb::new(0.2, 0.3, 0.4));
        let request = BindRequest::world(Vec3::zeros(), RegionId(0), 500.0, false);
        assert_eq!(fixture.binder().sample_ambient(&request), Rgb::new(0.2, 0.3, 0.4));
    }

    #[test]
    fn test_world_light_leads_the_list() {
        let mut fixture = Fixture::new();
        fixture.sources.0.insert(LightSource::omni(
            Vec3::new(10.0, 0.0, 0.0),
            Rgb::new(1.0, 0.0, 0.0),
            200.0,
        ));
        let mut lists = LightLists::new();
        let request = BindRequest::world(Vec3::zeros(), RegionId(0), 0.0, false);

        let binding = fixture.binder().bind(&mut lists, &request);
        let nodes: Vec<LightNode> = lists.iter(binding.handle).copied().collect();
        assert_eq!(nodes.len(), 2);
        assert!(!nodes[0].affected_by_ambient);
        assert_relative_eq!(nodes[0].light_side, 0.2);
        assert_relative_eq!(nodes[1].direction, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(nodes[1].color, Rgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_omni_intensity_falloff() {
        let mut fixture = Fixture::new();
        // 0.5 of the radius away gives intensity (1 - 0.5) * 2 = 1; 0.75 gives 0.5
        fixture.sources.0.insert(LightSource::omni(
            Vec3::new(75.0, 0.0, 0.0),
            Rgb::new(1.0, 1.0, 1.0),
            100.0,
        ));
        // Past 0.975 of the radius the light is too dim
        fixture.sources.0.insert(LightSource::omni(
            Vec3::new(0.0, 98.0, 0.0),
            Rgb::new(1.0, 1.0, 1.0),
            100.0,
        ));
        let mut lists = LightLists::new();
        let handle = fixture.binder().collect_affecting_lights(
            &mut lists,
            Vec3::zeros(),
            Rgb::zeros(),
            false,
        );
        let nodes: Vec<LightNode> = lists.iter(handle).copied().collect();
        assert_eq!(nodes.len(), 2);
        assert_relative_eq!(nodes[1].color, Rgb::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_glow_plane_only_lights_its_front() {
        let mut fixture = Fixture::new();
        fixture.sources.0.insert(LightSource::plane(
            Vec3::new(0.0, 0.0, 0.0),
            Rgb::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            1.0,
        ));

        let mut lists = LightLists::new();
        let above = fixture.binder().collect_affecting_lights(
            &mut lists,
            Vec3::new(0.0, 0.0, 25.0),
            Rgb::zeros(),
            false,
        );
        let below = fixture.binder().collect_affecting_lights(
            &mut lists,
            Vec3::new(0.0, 0.0, -25.0),
            Rgb::zeros(),
            false,
        );
        let past_height = fixture.binder().collect_affecting_lights(
            &mut lists,
            Vec3::new(0.0, 0.0, 150.0),
            Rgb::zeros(),
            false,
        );

        let glow: Vec<LightNode> = lists.iter(above).skip(1).copied().collect();
        assert_eq!(glow.len(), 1);
        // Height is capped at 100, so 25 units up leaves 75%
        assert_relative_eq!(glow[0].color, Rgb::new(0.0, 0.75, 0.0));
        assert_relative_eq!(glow[0].direction, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(lists.iter(below).count(), 1);
        // Beyond the glow height the plane adds nothing rather than darkening.
        assert_eq!(lists.iter(past_height).count(), 1);
    }

    #[test]
    fn test_stark_world_light() {
        let light = world_light(Rgb::new(0.5, 0.5, 0.5), true);
        assert_relative_eq!(light.light_side, 0.35);
        assert_relative_eq!(light.dark_side, 0.5);
        assert_relative_eq!(light.offset, 0.0);
    }
}
