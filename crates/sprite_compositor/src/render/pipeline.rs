//! Frame driver for the sprite pipeline
//!
//! [`SpritePipeline`] owns the map-lifetime state (frame table, light
//! adaptation curve, [`FrameContext`]) and runs the per-frame sequence:
//! rewind, project objects and weapons, add masked walls, sort, composite.

use crate::core::config::RenderConfig;
use crate::foundation::logging::{debug, info};
use crate::render::api::render_backend::DrawBackend;
use crate::render::api::scene::{SceneInterfaces, SceneObject, SpriteResources, ViewPlayer, ViewState};
use crate::render::compositor::{CompositeStats, Compositor};
use crate::render::frame::FrameContext;
use crate::render::lighting::{LightAdaptation, LightNode};
use crate::render::projection::{ProjectionSummary, VisibleObjectProjector};
use crate::render::sprites::SpriteFrameTable;
use crate::render::vissprite::MaskedWall;
use crate::render::RenderResult;

/// Everything drawn in one frame besides the scene interfaces
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput<'a> {
    /// World objects to project
    pub objects: &'a [SceneObject],
    /// Masked wall segments collected by the world renderer
    pub masked_walls: &'a [MaskedWall],
    /// Player whose weapons are drawn, if any
    pub player: Option<&'a ViewPlayer>,
}

/// Counts for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Projection counts
    pub projection: ProjectionSummary,
    /// Compositing counts
    pub composite: CompositeStats,
    /// Weapon records drawn
    pub weapons: usize,
    /// Vissprites that did not fit the buffer
    pub dropped: usize,
}

/// Map-lifetime sprite renderer
#[derive(Debug)]
pub struct SpritePipeline {
    config: RenderConfig,
    table: SpriteFrameTable,
    adaptation: LightAdaptation,
    frame: FrameContext,
    light_scratch: Vec<LightNode>,
}

impl SpritePipeline {
    /// Validate `config` and build the frame table from `resources`
    pub fn new(config: RenderConfig, resources: &dyn SpriteResources, map_ambient: u8) -> RenderResult<Self> {
        config.validate()?;
        let table = SpriteFrameTable::build(resources)?;
        let adaptation = LightAdaptation::for_map(&config.lighting, map_ambient);
        let frame = FrameContext::new(config.max_vissprites);

        info!(
            "Sprite pipeline ready: {} sprite(s), {} vissprite slot(s)",
            table.len(),
            config.max_vissprites
        );
        Ok(Self {
            config,
            table,
            adaptation,
            frame,
            light_scratch: Vec::new(),
        })
    }

    /// Rebuild the frame table and light curve for a new map
    pub fn load_map(&mut self, resources: &dyn SpriteResources, map_ambient: u8, sky_ceiling: f32) -> RenderResult<()> {
        self.table = SpriteFrameTable::build(resources)?;
        self.adaptation = LightAdaptation::for_map(&self.config.lighting, map_ambient);
        self.frame.set_sky_fix_ceiling(sky_ceiling);
        Ok(())
    }

    /// Active configuration
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Frame table of the current map
    pub const fn table(&self) -> &SpriteFrameTable {
        &self.table
    }

    /// Per-frame state as left by the last frame
    pub const fn frame(&self) -> &FrameContext {
        &self.frame
    }

    /// Render one frame into `backend`
    pub fn run_frame(
        &mut self,
        scene: SceneInterfaces<'_>,
        view: &ViewState,
        input: FrameInput<'_>,
        backend: &mut dyn DrawBackend,
    ) -> RenderResult<FrameStats> {
        self.frame.begin_frame();

        let projector = VisibleObjectProjector::new(scene, &self.table, view, &self.adaptation, &self.config);
        let projection = projector.project_objects(&mut self.frame, input.objects);
        if let Some(player) = input.player {
            projector.project_weapons(&mut self.frame, player);
        }
        for wall in input.masked_walls {
            self.frame.add_masked_wall(wall.clone(), view);
        }

        self.frame.sort();

        let mut compositor = Compositor::new(view, &self.config, scene.resources, &mut self.light_scratch);
        let composite = compositor.draw_masked(&self.frame, backend)?;
        let weapons = compositor.draw_weapons(&self.frame, backend)?;

        let stats = FrameStats {
            projection,
            composite,
            weapons,
            dropped: self.frame.vissprites().dropped(),
        };
        debug!("Frame {} done: {:?}", self.frame.frame_count(), stats);
        Ok(stats)
    }
}
