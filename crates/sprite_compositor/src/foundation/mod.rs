//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and binary angles
//! - Build-time bump arenas
//! - Frame-recycled pools
//! - Logging utilities

pub mod math;
pub mod memory;
pub mod collections;
pub mod logging;
