//! # Sprite Rendering
//!
//! Per-frame projection, lighting and back-to-front compositing of
//! sprites, model proxies, masked walls and flares.
//!
//! ## Architecture
//!
//! - **Sprites**: frame table built once per map from sprite resources
//! - **Lighting**: ambient sampling and pooled dynamic light lists
//! - **Projection**: world objects and weapons to draw records
//! - **Sorter**: strict back-to-front ordering of the frame's records
//! - **Compositor**: per-vertex lighting and draw calls to a backend
//! - **Pipeline**: the per-frame sequence tying it together

pub mod api;
pub mod sprites;
pub mod lighting;
pub mod vissprite;
pub mod sorter;
pub mod frame;
pub mod projection;
pub mod compositor;
pub mod pipeline;

use thiserror::Error;

use crate::config::ConfigError;
use crate::render::sprites::SpriteTableError;

pub use compositor::{light_vertex, vertex_colors, CompositeStats, Compositor};
pub use frame::FrameContext;
pub use pipeline::{FrameInput, FrameStats, SpritePipeline};
pub use sorter::DistanceSorter;
pub use vissprite::{
    FlareParams, MaskedWall, MaskedWallVertex, ModelParams, SpriteParams, VisPayload, VisSprite,
    VisSpriteBuffer, WallModulation, WeaponRecord, WeaponSpriteParams,
};

/// Errors from building or running the sprite pipeline
#[derive(Error, Debug)]
pub enum RenderError {
    /// The sprite frame table could not be built
    #[error("Sprite table error: {0}")]
    SpriteTable(#[from] SpriteTableError),

    /// The render configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A backend failed to issue a draw
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for pipeline operations
pub type RenderResult<T> = Result<T, RenderError>;
