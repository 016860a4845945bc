//! Sprite frame table
//!
//! Maps (sprite, animation frame, view octant) to a material and a
//! horizontal flip flag. The table is built once per map load from the
//! declared sprite resources and is immutable afterwards.
//!
//! Resource names follow the classic lump layout `NAMEfr` or `NAMEfrFR`:
//! a four character sprite name, a frame letter, a rotation digit and an
//! optional second frame/rotation pair that reuses the same patch mirrored.
//! Rotation 0 means "use this patch from every direction"; rotations 1 to 8
//! are 45 degree steps starting from the front.

use std::collections::HashMap;

use thiserror::Error;

use crate::foundation::logging::{debug, info, warn};
use crate::foundation::math::BinaryAngle;
use crate::foundation::memory::{ArenaIndex, BlockArena};
use crate::render::api::scene::{MaterialId, SpriteResources};

/// Number of view octants
pub const NUM_ROTATIONS: usize = 8;

/// Size of the temporary per-sprite frame table
pub const MAX_FRAMES: usize = 128;

/// Frames at or above this index are ignored
pub const MAX_SPRITE_FRAMES: usize = 30;

const SPRITE_NAME_LEN: usize = 4;
const SPRITE_RECORD_BLOCK: usize = 64;
const FRAME_RECORD_BLOCK: usize = 256;

/// Errors raised while building the frame table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpriteTableError {
    /// A frame below the highest frame has no patches at all
    #[error("no patches found for {sprite} frame {frame}")]
    NoPatches {
        /// Sprite name
        sprite: String,
        /// Frame letter
        frame: char,
    },

    /// A rotating frame lacks one or more of its eight views
    #[error("sprite {sprite} frame {frame} is missing rotations")]
    MissingRotations {
        /// Sprite name
        sprite: String,
        /// Frame letter
        frame: char,
    },
}

/// One animation frame of a sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteFrame {
    /// Whether the frame has a distinct patch per octant
    pub rotate: bool,
    /// Material per octant; all equal when `rotate` is false
    pub materials: [MaterialId; NUM_ROTATIONS],
    /// Horizontal flip per octant
    pub flip: [bool; NUM_ROTATIONS],
}

impl SpriteFrame {
    /// Material and flip for a view octant
    pub fn view(&self, octant: usize) -> (MaterialId, bool) {
        let slot = if self.rotate { octant % NUM_ROTATIONS } else { 0 };
        (self.materials[slot], self.flip[slot])
    }
}

/// All frames of one sprite
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpriteDef {
    /// Four character sprite name, upper case
    pub name: String,
    /// Frames in animation order
    pub frames: Vec<SpriteFrame>,
}

/// Octant of an object as seen from the viewer.
///
/// `view_angle` is the direction from the viewer to the object. Octant 0
/// is the object's front; boundaries fall at odd multiples of 22.5 degrees
/// and a boundary angle belongs to the following octant.
pub fn sprite_octant(view_angle: BinaryAngle, heading: BinaryAngle) -> usize {
    let rotated = view_angle
        .0
        .wrapping_sub(heading.0)
        .wrapping_add((BinaryAngle::ANG45 / 2).wrapping_mul(9));
    (rotated >> 29) as usize
}

/// A (frame, rotation) pair parsed from a resource name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameRotation {
    frame: usize,
    rotation: usize,
}

/// Collected frame resource; the second pair is the mirrored one
#[derive(Debug, Clone, Copy)]
struct FrameRecord {
    primary: FrameRotation,
    mirrored: Option<FrameRotation>,
    material: MaterialId,
}

/// Collected sprite with its frame records in encounter order
#[derive(Debug)]
struct SpriteRecord {
    name: String,
    frames: Vec<ArenaIndex>,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    /// `None` until any patch is installed
    rotate: Option<bool>,
    views: [Option<(MaterialId, bool)>; NUM_ROTATIONS],
}

impl PendingFrame {
    const EMPTY: Self = Self {
        rotate: None,
        views: [None; NUM_ROTATIONS],
    };
}

fn parse_frame_rotation(frame: u8, rotation: u8) -> Option<FrameRotation> {
    let frame = frame.to_ascii_uppercase();
    if frame < b'A' || !rotation.is_ascii_digit() {
        return None;
    }
    Some(FrameRotation {
        frame: usize::from(frame - b'A'),
        rotation: usize::from(rotation - b'0'),
    })
}

/// Split a resource name into sprite name, primary pair and mirrored pair
fn parse_resource_name(name: &str) -> Option<(String, FrameRotation, Option<FrameRotation>)> {
    let bytes = name.as_bytes();
    if bytes.len() < SPRITE_NAME_LEN + 2 || !name.is_ascii() {
        return None;
    }
    let sprite = name[..SPRITE_NAME_LEN].to_ascii_uppercase();
    let primary = parse_frame_rotation(bytes[4], bytes[5])?;
    let mirrored = if bytes.len() >= SPRITE_NAME_LEN + 4 {
        Some(parse_frame_rotation(bytes[6], bytes[7])?)
    } else {
        None
    };
    Some((sprite, primary, mirrored))
}

/// Scratch state for one table build; dropped once the table is frozen
struct TableBuilder {
    sprites: BlockArena<SpriteRecord>,
    frames: BlockArena<FrameRecord>,
    by_name: HashMap<String, ArenaIndex>,
    order: Vec<ArenaIndex>,
}

impl TableBuilder {
    fn new() -> Self {
        Self {
            sprites: BlockArena::with_block_size(SPRITE_RECORD_BLOCK),
            frames: BlockArena::with_block_size(FRAME_RECORD_BLOCK),
            by_name: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn add_resource(&mut self, name: &str, material: MaterialId) {
        let Some((sprite, primary, mirrored)) = parse_resource_name(name) else {
            warn!("Ignoring sprite resource with malformed name '{}'", name);
            return;
        };

        let record_idx = match self.by_name.get(&sprite) {
            Some(&idx) => idx,
            None => {
                let idx = self.sprites.alloc(SpriteRecord {
                    name: sprite.clone(),
                    frames: Vec::new(),
                });
                self.by_name.insert(sprite, idx);
                self.order.push(idx);
                idx
            }
        };

        let existing = self.sprites.get(record_idx).and_then(|record| {
            record.frames.iter().copied().find(|&frame_idx| {
                self.frames
                    .get(frame_idx)
                    .is_some_and(|frame| frame.primary == primary)
            })
        });

        let frame = FrameRecord {
            primary,
            mirrored,
            material,
        };
        match existing {
            Some(frame_idx) => {
                if let Some(slot) = self.frames.get_mut(frame_idx) {
                    *slot = frame;
                }
            }
            None => {
                let frame_idx = self.frames.alloc(frame);
                if let Some(record) = self.sprites.get_mut(record_idx) {
                    record.frames.push(frame_idx);
                }
            }
        }
    }

    /// Place records at their legacy index; the rest follow in encounter order
    fn legacy_order(&self, legacy_names: &[String]) -> Vec<Option<ArenaIndex>> {
        let mut slots: Vec<Option<ArenaIndex>> = vec![None; legacy_names.len()];
        let mut unmatched = Vec::new();

        for &record_idx in &self.order {
            let Some(record) = self.sprites.get(record_idx) else {
                continue;
            };
            let legacy = legacy_names
                .iter()
                .position(|legacy| legacy.eq_ignore_ascii_case(&record.name));
            match legacy {
                Some(index) => slots[index] = Some(record_idx),
                None => unmatched.push(Some(record_idx)),
            }
        }

        slots.extend(unmatched);
        slots
    }

    fn freeze_sprite(&self, record: &SpriteRecord) -> Result<SpriteDef, SpriteTableError> {
        let mut pending = [PendingFrame::EMPTY; MAX_FRAMES];
        let mut max_frame: Option<usize> = None;

        for frame in record.frames.iter().filter_map(|&idx| self.frames.get(idx)) {
            install_view(&mut pending, &mut max_frame, frame.material, frame.primary, false);
            if let Some(mirrored) = frame.mirrored {
                install_view(&mut pending, &mut max_frame, frame.material, mirrored, true);
            }
        }

        let frame_count = max_frame.map_or(0, |max| max + 1);
        let mut frames = Vec::with_capacity(frame_count);
        for (index, slot) in pending.iter().take(frame_count).enumerate() {
            let letter = frame_letter(index);
            let rotate = slot.rotate.ok_or_else(|| SpriteTableError::NoPatches {
                sprite: record.name.clone(),
                frame: letter,
            })?;

            let mut frame = SpriteFrame {
                rotate,
                ..SpriteFrame::default()
            };
            let needed = if rotate { NUM_ROTATIONS } else { 1 };
            for (octant, view) in slot.views.iter().enumerate() {
                match view {
                    Some((material, flip)) => {
                        frame.materials[octant] = *material;
                        frame.flip[octant] = *flip;
                    }
                    None if octant < needed => {
                        return Err(SpriteTableError::MissingRotations {
                            sprite: record.name.clone(),
                            frame: letter,
                        });
                    }
                    None => {}
                }
            }
            frames.push(frame);
        }

        Ok(SpriteDef {
            name: record.name.clone(),
            frames,
        })
    }
}

fn frame_letter(index: usize) -> char {
    #[allow(clippy::cast_possible_truncation)]
    char::from(b'A' + (index % MAX_FRAMES) as u8)
}

fn install_view(
    pending: &mut [PendingFrame; MAX_FRAMES],
    max_frame: &mut Option<usize>,
    material: MaterialId,
    at: FrameRotation,
    flipped: bool,
) {
    if at.frame >= MAX_SPRITE_FRAMES || at.rotation > NUM_ROTATIONS {
        return;
    }
    *max_frame = Some(max_frame.map_or(at.frame, |max| max.max(at.frame)));

    let frame = &mut pending[at.frame];
    if at.rotation == 0 {
        frame.rotate = Some(false);
        frame.views = [Some((material, flipped)); NUM_ROTATIONS];
    } else {
        frame.rotate = Some(true);
        frame.views[at.rotation - 1] = Some((material, flipped));
    }
}

/// Dense, immutable sprite definitions indexed by sprite number
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpriteFrameTable {
    sprites: Vec<SpriteDef>,
}

impl SpriteFrameTable {
    /// Build the table from every declared sprite resource
    pub fn build(resources: &dyn SpriteResources) -> Result<Self, SpriteTableError> {
        let declared = resources.sprite_resources();
        let mut builder = TableBuilder::new();
        for resource in &declared {
            builder.add_resource(&resource.name, resource.material);
        }

        let legacy_names = resources.legacy_sprite_names();
        let order = builder.legacy_order(legacy_names);

        let mut sprites = Vec::with_capacity(order.len());
        for (index, slot) in order.into_iter().enumerate() {
            let record = slot.and_then(|idx| builder.sprites.get(idx));
            let def = match record {
                Some(record) => builder.freeze_sprite(record)?,
                None => SpriteDef {
                    name: legacy_names
                        .get(index)
                        .map(|name| name.to_ascii_uppercase())
                        .unwrap_or_default(),
                    frames: Vec::new(),
                },
            };
            sprites.push(def);
        }

        debug!(
            "Sprite scan used {} record block(s) and {} frame block(s)",
            builder.sprites.block_count(),
            builder.frames.block_count()
        );
        info!(
            "Built sprite frame table: {} sprites from {} resources",
            sprites.len(),
            declared.len()
        );

        Ok(Self { sprites })
    }

    /// Number of sprite definitions
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Whether the table holds no sprites
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Sprite definition by number
    pub fn sprite(&self, sprite: usize) -> Option<&SpriteDef> {
        self.sprites.get(sprite)
    }

    /// Frame of a sprite
    pub fn frame(&self, sprite: usize, frame: usize) -> Option<&SpriteFrame> {
        self.sprites.get(sprite)?.frames.get(frame)
    }

    /// Material and flip for a sprite frame seen from `octant`
    pub fn lookup(&self, sprite: usize, frame: usize, octant: usize) -> Option<(MaterialId, bool)> {
        self.frame(sprite, frame).map(|f| f.view(octant))
    }

    /// Front-facing material of a sprite frame
    pub fn material_for(&self, sprite: usize, frame: usize) -> Option<MaterialId> {
        self.frame(sprite, frame).map(|f| f.materials[0])
    }

    /// Sprite number for a four character name, case-insensitive
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.sprites
            .iter()
            .position(|def| def.name.eq_ignore_ascii_case(name))
    }
}
