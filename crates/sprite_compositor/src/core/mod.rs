//! # Core Module
//!
//! Shared configuration for the sprite pipeline.
//!
//! ## Organization
//!
//! - **Config**: render settings loaded from TOML or RON
//! - **Foundation**: low-level utilities (math, collections, memory, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    RenderConfig,
    SpriteConfig,
    SpriteAlignment,
    LightingConfig,
    WeaponConfig,
    HaloConfig,
    Config,
    ConfigError,
    ConfigFormat,
};
