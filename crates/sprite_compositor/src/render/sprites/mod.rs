//! Sprite definitions built from declared sprite resources

pub mod frame_table;

pub use frame_table::{sprite_octant, SpriteDef, SpriteFrame, SpriteFrameTable, SpriteTableError};
