//! Dynamic lighting for sprites and models
//!
//! - `light_list`: pooled per-frame light lists
//! - `adaptation`: light level curve, distance falloff and torch
//! - `binder`: ambient sampling and light collection per point

pub mod light_list;
pub mod adaptation;
pub mod binder;

pub use light_list::{LightListHandle, LightLists, LightNode};
pub use adaptation::{apply_torch, attenuate_light_level, LightAdaptation};
pub use binder::{world_light, BindRequest, DynamicLightBinder, LightBinding};
