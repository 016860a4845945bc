//! Masked viewer
//!
//! Orbits a camera around a small arena and renders each frame through the
//! sprite pipeline into a recording backend, logging what was drawn. Pass a
//! `.toml` or `.ron` render config as the first argument to override the
//! defaults.

use std::f32::consts::TAU;

use sprite_compositor::foundation::logging;
use sprite_compositor::prelude::*;
use sprite_compositor::render::api::{BlendMode, LightSourceId};
use sprite_compositor::render::MaskedWallVertex;

const FRAMES: usize = 16;
const ORBIT_RADIUS: f32 = 384.0;
const EYE_HEIGHT: f32 = 41.0;
const RING_RADIUS: f32 = 160.0;
const RING_SIZE: u32 = 6;
const PILLAR_HALF_WIDTH: f32 = 24.0;
/// Off the arena center, so the pillar only hides the lamp when the camera
/// lines up with it
const LAMP_POSITION: [f32; 2] = [-120.0, -40.0];

/// Sprite numbers, in legacy name order
const SPRITE_NAMES: [&str; 3] = ["POSS", "TLMP", "PISG"];
const POSS: usize = 0;
const TLMP: usize = 1;
const PISG: usize = 2;

struct Arena {
    scene: MemoryScene,
    region: RegionId,
    lamp_light: LightSourceId,
    objects: Vec<SceneObject>,
    fence: MaskedWall,
}

fn build_arena() -> Arena {
    let mut scene = MemoryScene::new();
    let region = scene.add_region(
        Region::new(Vec2::new(-512.0, -512.0), Vec2::new(512.0, 512.0), RegionPlanes::flat(0.0, 192.0))
            .with_light(0.55, Rgb::new(1.0, 0.95, 0.9))
            .with_sky(),
    );

    for name in ["POSSA1", "POSSA2A8", "POSSA3A7", "POSSA4A6", "POSSA5"] {
        scene.add_sprite_patch(name, MaterialInfo::sprite(40.0, 56.0));
    }
    scene.add_sprite_patch("TLMPA0", MaterialInfo::sprite(24.0, 80.0));
    scene.add_sprite_patch("PISGA0", MaterialInfo::sprite(64.0, 48.0));
    let fence_material = scene.add_material(MaterialInfo::sprite(64.0, 128.0));
    scene.set_legacy_names(SPRITE_NAMES);

    let lamp_light = scene.add_light(LightSource::omni(
        Vec3::new(LAMP_POSITION[0], LAMP_POSITION[1], 72.0),
        Rgb::new(1.0, 0.7, 0.3),
        200.0,
    ));

    let mut objects: Vec<SceneObject> = (0..RING_SIZE)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let phase = i as f32 / RING_SIZE as f32 * TAU;
            let position = Vec3::new(phase.cos() * RING_RADIUS, phase.sin() * RING_RADIUS, 0.0);
            SceneObject::new(ObjectId(i + 1), position, region)
                .with_state(AnimState::new(StateId(1), POSS, 0))
                .with_heading(BinaryAngle::from_radians(phase))
        })
        .collect();

    let mut lamp = SceneObject::new(ObjectId(100), Vec3::new(LAMP_POSITION[0], LAMP_POSITION[1], 0.0), region)
        .with_state(AnimState::new(StateId(2), TLMP, 0).full_bright());
    lamp.attached_light = Some(lamp_light);
    objects.push(lamp);

    let mut ghost = SceneObject::new(ObjectId(101), Vec3::new(-96.0, 64.0, 24.0), region)
        .with_state(AnimState::new(StateId(1), POSS, 0))
        .with_flags(ObjectFlags::BOB);
    ghost.translucency = 128;
    objects.push(ghost);

    Arena {
        scene,
        region,
        lamp_light,
        objects,
        fence: fence(fence_material),
    }
}

fn fence(material: MaterialId) -> MaskedWall {
    let vertex = |x: f32, z: f32| MaskedWallVertex {
        position: Vec3::new(x, 240.0, z),
        color: Rgba::new(0.6, 0.6, 0.6, 1.0),
    };
    MaskedWall {
        vertices: [vertex(-64.0, 0.0), vertex(-64.0, 128.0), vertex(64.0, 0.0), vertex(64.0, 128.0)],
        material,
        tex_coords: [[0.0, 2.0], [0.0, 1.0]],
        blend: BlendMode::Normal,
        modulation: None,
    }
}

fn load_config() -> Result<RenderConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading render config from {}", path);
            RenderConfig::load_from_file(&path)
        }
        None => Ok(RenderConfig::default()),
    }
}

/// Camera on the orbit at `step`, looking at the arena center
#[allow(clippy::cast_precision_loss)]
fn orbit_view(step: usize) -> ViewState {
    let phase = step as f32 / FRAMES as f32 * TAU;
    let position = Vec3::new(phase.cos() * ORBIT_RADIUS, phase.sin() * ORBIT_RADIUS, EYE_HEIGHT);
    let mut view = ViewState::new(position, BinaryAngle::between(-position.x, -position.y));
    view.map_time = step as f32 / 35.0;
    view.frame_time = 0.5;
    view
}

/// Occlude the directions covered by a pillar halfway to the center
fn clip_pillar(clipper: &mut AngleClipper, view: &ViewState) {
    clipper.clear();
    let pillar = view.position.xy() * 0.5;
    let side = Vec2::new(-view.front().y, view.front().x) * PILLAR_HALF_WIDTH;
    let eye = view.position.xy();
    clipper.clip_segment(pillar - side - eye, pillar + side - eye);
}

fn count_calls(backend: &RecordingBackend) -> [usize; 4] {
    let mut counts = [0; 4];
    for call in backend.calls() {
        let slot = match call {
            DrawCall::Sprite(_) | DrawCall::WeaponSprite(_) => 0,
            DrawCall::Model(_) | DrawCall::WeaponModel(_) => 1,
            DrawCall::MaskedWall(_) => 2,
            DrawCall::Halo { .. } | DrawCall::HaloPass(_) => 3,
        };
        counts[slot] += 1;
    }
    counts
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");
    log::info!("Starting masked viewer");

    let config = load_config()?;
    let mut arena = build_arena();
    let mut pipeline = SpritePipeline::new(config, &arena.scene, 24)?;

    let player = ViewPlayer {
        region: arena.region,
        is_camera: false,
        weapons: vec![WeaponSprite {
            state: Some(AnimState::new(StateId(3), PISG, 0)),
            tics: 6,
            position: Vec2::new(1.0, 32.0),
            alpha: 1.0,
            full_bright: false,
        }],
    };

    let mut clipper = AngleClipper::new();
    let mut backend = RecordingBackend::new();
    let walls = [arena.fence.clone()];

    for step in 0..FRAMES {
        let view = orbit_view(step);
        clip_pillar(&mut clipper, &view);

        #[allow(clippy::cast_precision_loss)]
        let flicker = 0.8 + 0.2 * (step as f32 * 1.7).sin();
        if let Some(light) = arena.scene.light_mut(arena.lamp_light) {
            light.color = Rgb::new(flicker, 0.7 * flicker, 0.3 * flicker);
        }

        backend.clear();
        let input = FrameInput {
            objects: &arena.objects,
            masked_walls: &walls,
            player: Some(&player),
        };
        let stats = pipeline.run_frame(arena.scene.interfaces(&clipper), &view, input, &mut backend)?;
        let [sprites, models, walls_drawn, halos] = count_calls(&backend);

        log::info!(
            "Frame {:2}: {} projected, {} skipped, {} sprite call(s), {} model call(s), {} wall(s), {} halo call(s)",
            step,
            stats.projection.sprites + stats.projection.models + stats.projection.flares,
            stats.projection.skipped,
            sprites,
            models,
            walls_drawn,
            halos
        );
    }

    log::info!("Sky fix settled at {:.1}", pipeline.frame().sky_fix_ceiling());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamp_halo_shows_around_the_orbit() {
        let arena = build_arena();
        let mut pipeline = SpritePipeline::new(RenderConfig::default(), &arena.scene, 24).unwrap();
        let mut clipper = AngleClipper::new();
        let mut backend = RecordingBackend::new();

        let mut lit_frames = 0;
        for step in 0..FRAMES {
            let view = orbit_view(step);
            clip_pillar(&mut clipper, &view);
            backend.clear();
            let input = FrameInput {
                objects: &arena.objects,
                ..FrameInput::default()
            };
            pipeline
                .run_frame(arena.scene.interfaces(&clipper), &view, input, &mut backend)
                .unwrap();
            if backend
                .calls()
                .iter()
                .any(|call| matches!(call, DrawCall::Halo { primary: true, .. }))
            {
                lit_frames += 1;
            }
        }
        // The pillar only lines up with the lamp on a few steps of the orbit.
        assert!(lit_frames > FRAMES / 2, "halo drawn on {lit_frames} of {FRAMES} frames");
    }
}
