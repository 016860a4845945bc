//! # Sprite Compositor
//!
//! Per-frame sprite rendering for a sector-based 3D renderer: world objects
//! and first-person weapons become camera-facing sprites or model proxies,
//! each picks up the dynamic lights around it, and everything translucent
//! is drawn in strict back-to-front order.
//!
//! ## Features
//!
//! - **Frame Table**: (sprite, frame, octant) to material lookup built per map
//! - **Dynamic Lights**: pooled per-frame light lists with ambient sampling
//! - **Projection**: placement, model substitution, flares and weapons
//! - **Compositing**: distance-sorted masked pass over a pluggable backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprite_compositor::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let mut scene = MemoryScene::new();
//!     scene.add_sprite_patch("TROOA0", MaterialInfo::sprite(41.0, 57.0));
//!
//!     let mut pipeline = SpritePipeline::new(RenderConfig::default(), &scene, 0)?;
//!     let clipper = AngleClipper::new();
//!     let view = ViewState::new(Vec3::new(0.0, 0.0, 41.0), BinaryAngle(0));
//!     let mut backend = RecordingBackend::new();
//!
//!     pipeline.run_frame(scene.interfaces(&clipper), &view, FrameInput::default(), &mut backend)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        core::config::{
            Config, ConfigError, ConfigFormat, HaloConfig, LightingConfig, RenderConfig,
            SpriteAlignment, SpriteConfig, WeaponConfig,
        },
        foundation::math::{BinaryAngle, Rgb, Rgba, Vec2, Vec3},
        render::{
            api::{
                AnimState, DrawBackend, DrawCall, LightSource, MaterialId, MaterialInfo,
                ObjectFlags, ObjectId, RecordingBackend, RegionId, RegionPlanes, SceneInterfaces,
                SceneObject, StateId, ViewPlayer, ViewState, WeaponSprite,
            },
            FrameInput, FrameStats, MaskedWall, RenderError, SpritePipeline,
        },
        scene::{AngleClipper, MemoryScene, Region},
    };
}
