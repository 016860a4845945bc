//! In-memory scene implementations
//!
//! Stand-ins for the map, resource and visibility layers the sprite
//! pipeline queries through `render::api`.

mod memory_scene;
mod angle_clipper;

pub use memory_scene::{MemoryScene, Region};
pub use angle_clipper::AngleClipper;
