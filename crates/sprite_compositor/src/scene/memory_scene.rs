//! In-memory scene
//!
//! A self-contained implementation of every scene query trait: axis-aligned
//! regions, light sources in a `SlotMap`, sprite patches and a state to
//! model table. Used by the tests and the viewer demo.

use std::collections::HashMap;
use std::ops::ControlFlow;

use crate::foundation::collections::SlotMap;
use crate::foundation::math::{Rgb, Vec2, Vec3};
use crate::render::api::scene::{
    AnimState, LightSource, LightSourceId, LightSourceKind, LightSourceRegistry, MaterialId, MaterialInfo,
    ModelRegistry, ModelSelection, Occlusion, RegionId, RegionPlanes, RegionQuery, SceneInterfaces,
    SpriteResource, SpriteResources, StateId,
};

/// An axis-aligned map region
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Lower corner on the map plane
    pub min: Vec2,
    /// Upper corner on the map plane
    pub max: Vec2,
    /// Floor and ceiling heights
    pub planes: RegionPlanes,
    /// Light level in `[0, 1]`
    pub light_level: f32,
    /// Light color
    pub light_color: Rgb,
    /// Open sky above
    pub sky_ceiling: bool,
}

impl Region {
    /// Fully lit white region
    pub fn new(min: Vec2, max: Vec2, planes: RegionPlanes) -> Self {
        Self {
            min,
            max,
            planes,
            light_level: 1.0,
            light_color: Rgb::new(1.0, 1.0, 1.0),
            sky_ceiling: false,
        }
    }

    /// Set the light level and color
    pub fn with_light(mut self, level: f32, color: Rgb) -> Self {
        self.light_level = level;
        self.light_color = color;
        self
    }

    /// Open the ceiling to the sky
    pub fn with_sky(mut self) -> Self {
        self.sky_ceiling = true;
        self
    }

    fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    fn touches_circle(&self, center: Vec2, radius: f32) -> bool {
        let nearest = Vec2::new(center.x.clamp(self.min.x, self.max.x), center.y.clamp(self.min.y, self.max.y));
        (nearest - center).norm() <= radius
    }
}

/// Scene data held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryScene {
    regions: Vec<Region>,
    lights: SlotMap<LightSourceId, LightSource>,
    sprites: Vec<SpriteResource>,
    legacy_names: Vec<String>,
    materials: Vec<MaterialInfo>,
    models: HashMap<StateId, ModelSelection>,
    light_grid: Option<Rgb>,
}

impl MemoryScene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region
    pub fn add_region(&mut self, region: Region) -> RegionId {
        self.regions.push(region);
        RegionId(u32::try_from(self.regions.len() - 1).unwrap_or(u32::MAX))
    }

    /// Region by handle
    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0 as usize)
    }

    /// Mutable region by handle
    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(id.0 as usize)
    }

    /// First region containing `point`
    pub fn region_at(&self, point: Vec2) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|region| region.contains(point))
            .and_then(|index| u32::try_from(index).ok())
            .map(RegionId)
    }

    /// Register a light source
    pub fn add_light(&mut self, light: LightSource) -> LightSourceId {
        self.lights.insert(light)
    }

    /// Unregister a light source
    pub fn remove_light(&mut self, id: LightSourceId) -> Option<LightSource> {
        self.lights.remove(id)
    }

    /// Mutable light source by handle
    pub fn light_mut(&mut self, id: LightSourceId) -> Option<&mut LightSource> {
        self.lights.get_mut(id)
    }

    /// Register a material outside the sprite table
    pub fn add_material(&mut self, info: MaterialInfo) -> MaterialId {
        self.materials.push(info);
        MaterialId(u32::try_from(self.materials.len() - 1).unwrap_or(u32::MAX))
    }

    /// Register a sprite patch under a lump-style name, e.g. `TROOA1`
    pub fn add_sprite_patch(&mut self, name: &str, info: MaterialInfo) -> MaterialId {
        let material = self.add_material(info);
        self.sprites.push(SpriteResource::new(name, material));
        material
    }

    /// Replace the legacy sprite name table
    pub fn set_legacy_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_names = names.into_iter().map(Into::into).collect();
    }

    /// Draw `state` with a model
    pub fn set_model(&mut self, state: StateId, selection: ModelSelection) {
        self.models.insert(state, selection);
    }

    /// Use a uniform light grid color instead of region levels
    pub fn set_light_grid(&mut self, color: Option<Rgb>) {
        self.light_grid = color;
    }

    /// Borrow the scene as the interface bundle a frame needs
    pub fn interfaces<'a>(&'a self, occlusion: &'a dyn Occlusion) -> SceneInterfaces<'a> {
        SceneInterfaces {
            regions: self,
            lights: self,
            resources: self,
            models: self,
            occlusion,
        }
    }
}

impl RegionQuery for MemoryScene {
    fn planes(&self, region: RegionId) -> RegionPlanes {
        self.region(region).map(|r| r.planes).unwrap_or_default()
    }

    fn light_level(&self, region: RegionId) -> f32 {
        self.region(region).map_or(0.0, |r| r.light_level)
    }

    fn light_color(&self, region: RegionId) -> Rgb {
        self.region(region).map_or_else(Rgb::zeros, |r| r.light_color)
    }

    fn ceiling_is_sky(&self, region: RegionId) -> bool {
        self.region(region).is_some_and(|r| r.sky_ceiling)
    }

    fn light_grid(&self, _point: Vec3) -> Option<Rgb> {
        self.light_grid
    }

    fn for_each_touching_region(&self, center: Vec2, radius: f32, f: &mut dyn FnMut(RegionId)) {
        for (index, region) in self.regions.iter().enumerate() {
            if region.touches_circle(center, radius) {
                if let Ok(index) = u32::try_from(index) {
                    f(RegionId(index));
                }
            }
        }
    }
}

impl LightSourceRegistry for MemoryScene {
    /// Planes span their whole region and are always visited.
    fn for_each_in_radius(
        &self,
        center: Vec3,
        radius: f32,
        f: &mut dyn FnMut(LightSourceId, &LightSource) -> ControlFlow<()>,
    ) {
        for (id, light) in &self.lights {
            let in_range = match light.kind {
                LightSourceKind::Omni { .. } => (light.origin.xy() - center.xy()).norm() <= radius,
                LightSourceKind::Plane { .. } => true,
            };
            if in_range && f(id, light).is_break() {
                return;
            }
        }
    }

    fn get(&self, id: LightSourceId) -> Option<&LightSource> {
        self.lights.get(id)
    }
}

impl SpriteResources for MemoryScene {
    fn sprite_resources(&self) -> Vec<SpriteResource> {
        self.sprites.clone()
    }

    fn legacy_sprite_names(&self) -> &[String] {
        &self.legacy_names
    }

    fn material(&self, id: MaterialId) -> Option<MaterialInfo> {
        self.materials.get(id.0 as usize).copied()
    }
}

impl ModelRegistry for MemoryScene {
    fn model_for(&self, state: &AnimState, _tics: i32, _selector: u32) -> Option<ModelSelection> {
        self.models.get(&state.id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(min: (f32, f32), max: (f32, f32)) -> Region {
        Region::new(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1), RegionPlanes::flat(0.0, 128.0))
    }

    #[test]
    fn test_regions_touching_a_circle() {
        let mut scene = MemoryScene::new();
        let left = scene.add_region(room((0.0, 0.0), (100.0, 100.0)));
        let right = scene.add_region(room((100.0, 0.0), (200.0, 100.0)));

        let mut touched = Vec::new();
        scene.for_each_touching_region(Vec2::new(95.0, 50.0), 10.0, &mut |r| touched.push(r));
        assert_eq!(touched, vec![left, right]);

        touched.clear();
        scene.for_each_touching_region(Vec2::new(50.0, 50.0), 10.0, &mut |r| touched.push(r));
        assert_eq!(touched, vec![left]);

        assert_eq!(scene.region_at(Vec2::new(150.0, 50.0)), Some(right));
        assert_eq!(scene.region_at(Vec2::new(150.0, 150.0)), None);
        assert!(scene.planes(RegionId(9)).is_degenerate());
    }

    #[test]
    fn test_light_radius_query_stops_on_break() {
        let mut scene = MemoryScene::new();
        let white = Rgb::new(1.0, 1.0, 1.0);
        scene.add_light(LightSource::omni(Vec3::new(10.0, 0.0, 0.0), white, 100.0));
        scene.add_light(LightSource::omni(Vec3::new(20.0, 0.0, 0.0), white, 100.0));
        scene.add_light(LightSource::omni(Vec3::new(500.0, 0.0, 0.0), white, 100.0));

        let mut seen = 0;
        scene.for_each_in_radius(Vec3::zeros(), 64.0, &mut |_, _| {
            seen += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(seen, 2);

        seen = 0;
        scene.for_each_in_radius(Vec3::zeros(), 64.0, &mut |_, _| {
            seen += 1;
            ControlFlow::Break(())
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_sprite_patches_resolve_to_materials() {
        let mut scene = MemoryScene::new();
        let material = scene.add_sprite_patch("TROOA0", MaterialInfo::sprite(32.0, 48.0));
        assert_eq!(scene.sprite_resources(), vec![SpriteResource::new("TROOA0", material)]);
        assert_eq!(scene.material(material).map(|m| m.height), Some(48.0));
    }
}
