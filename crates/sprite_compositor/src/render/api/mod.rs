//! Public compositing API
//!
//! This module contains the interfaces the pipeline talks through: scene
//! queries on the input side and the draw backend on the output side.

pub mod scene;
pub mod render_backend;
pub mod recording;

// Re-export commonly used types
pub use scene::{
    AnimState, AutoLightAnalysis, FlareFlags, FlareTexture, FlareTextureId, LightSource,
    LightSourceId, LightSourceKind, LightSourceRegistry, MaterialId, MaterialInfo, ModelFlags,
    ModelId, ModelRegistry, ModelSelection, ObjectFlags, ObjectId, Occlusion, RegionId,
    RegionPlanes, RegionQuery, ResourceNamespace, SceneInterfaces, SceneObject, SpriteResource,
    SpriteResources, StateFlags, StateId, StateLight, Torch, ViewPlayer, ViewState, WeaponSprite,
};
pub use render_backend::{
    BackendResult, BlendMode, DrawBackend, HaloDraw, ModelDraw, QuadRotation, SpriteQuad,
    VertexColor, WeaponQuad,
};
pub use recording::{DrawCall, RecordedModel, RecordingBackend};
