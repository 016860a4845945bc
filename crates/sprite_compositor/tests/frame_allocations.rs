//! Steady-state frames must not touch the heap
//!
//! A counting global allocator records allocations made by the test thread
//! while one frame runs. Every per-frame store is sized by the warm-up frames,
//! so a repeated frame reuses all of it.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use sprite_compositor::prelude::*;
use sprite_compositor::render::api::{BlendMode, ModelFlags, ModelId, ModelSelection};
use sprite_compositor::render::MaskedWallVertex;

struct CountingAllocator;

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

fn note_allocation() {
    let counting = COUNTING.try_with(Cell::get).unwrap_or(false);
    if counting {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
    }
}

#[allow(unsafe_code)]
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        note_allocation();
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        note_allocation();
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        note_allocation();
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

/// Allocations made on this thread while `f` runs
fn count_allocations<R>(f: impl FnOnce() -> R) -> (R, usize) {
    ALLOCATIONS.with(|count| count.set(0));
    COUNTING.with(|counting| counting.set(true));
    let result = f();
    COUNTING.with(|counting| counting.set(false));
    (result, ALLOCATIONS.with(Cell::get))
}

const OBJECTS: u32 = 200;
const MODEL_STATE: StateId = StateId(2);

fn fence(x: f32, material: MaterialId) -> MaskedWall {
    let vertex = |y: f32, z: f32| MaskedWallVertex {
        position: Vec3::new(x, y, z),
        color: Rgba::new(1.0, 1.0, 1.0, 1.0),
    };
    MaskedWall {
        vertices: [vertex(-32.0, 0.0), vertex(-32.0, 128.0), vertex(32.0, 0.0), vertex(32.0, 128.0)],
        material,
        tex_coords: [[0.0, 1.0], [0.0, 1.0]],
        blend: BlendMode::Normal,
        modulation: None,
    }
}

#[test]
fn repeated_frame_reuses_every_buffer() {
    let mut scene = MemoryScene::new();
    let region = scene.add_region(
        Region::new(Vec2::new(-2048.0, -2048.0), Vec2::new(2048.0, 2048.0), RegionPlanes::flat(0.0, 256.0))
            .with_light(0.6, Rgb::new(1.0, 1.0, 1.0)),
    );
    scene.add_sprite_patch("TROOA0", MaterialInfo::sprite(32.0, 64.0));
    scene.add_sprite_patch("PISGA0", MaterialInfo::sprite(64.0, 48.0));
    let fence_material = scene.add_material(MaterialInfo::sprite(64.0, 128.0));
    scene.set_legacy_names(["TROO", "PISG"]);
    scene.set_model(
        MODEL_STATE,
        ModelSelection {
            model: ModelId(3),
            next: None,
            inter: 0.0,
            flags: ModelFlags::empty(),
            visual_radius: 20.0,
        },
    );
    let light = scene.add_light(LightSource::omni(Vec3::new(300.0, 0.0, 48.0), Rgb::new(1.0, 0.8, 0.4), 256.0));

    let objects: Vec<SceneObject> = (0..OBJECTS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let (row, column) = ((i / 20) as f32, (i % 20) as f32);
            let position = Vec3::new(100.0 + row * 40.0, (column - 10.0) * 40.0, 0.0);
            let state = if i % 10 == 0 { MODEL_STATE } else { StateId(1) };
            let mut object =
                SceneObject::new(ObjectId(i + 1), position, region).with_state(AnimState::new(state, 0, 0));
            if i % 25 == 0 {
                object.attached_light = Some(light);
            }
            object
        })
        .collect();
    let walls = [fence(150.0, fence_material), fence(450.0, fence_material)];
    let player = ViewPlayer {
        region,
        is_camera: false,
        weapons: vec![WeaponSprite {
            state: Some(AnimState::new(StateId(5), 1, 0)),
            tics: 4,
            position: Vec2::new(1.0, 32.0),
            alpha: 1.0,
            full_bright: false,
        }],
    };

    let mut pipeline = SpritePipeline::new(RenderConfig::default().with_max_vissprites(512), &scene, 0).unwrap();
    let clipper = AngleClipper::new();
    let mut backend = RecordingBackend::new();
    let view = ViewState::new(Vec3::new(0.0, 0.0, 41.0), BinaryAngle(0));
    let input = FrameInput {
        objects: &objects,
        masked_walls: &walls,
        player: Some(&player),
    };

    let mut frame = |backend: &mut RecordingBackend| {
        backend.clear();
        pipeline.run_frame(scene.interfaces(&clipper), &view, input, backend)
    };
    for _ in 0..3 {
        frame(&mut backend).unwrap();
    }

    let (stats, allocations) = count_allocations(|| frame(&mut backend));
    let stats = stats.unwrap();
    assert!(stats.projection.models > 0);
    assert!(stats.projection.flares > 0);
    assert!(stats.composite.sprites > 0);
    assert_eq!(stats.composite.masked_walls, 2);
    assert_eq!(stats.dropped, 0);
    assert_eq!(allocations, 0);
}
