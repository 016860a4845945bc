//! Visible object projection
//!
//! - `placement`: alpha, blending, SRVO and vertical placement rules
//! - `object`: world objects to sprite, model and flare vissprites
//! - `weapon`: first-person weapon records

pub mod placement;
pub mod object;
pub mod weapon;

pub use object::{
    ProjectedKind, ProjectionOutcome, ProjectionSummary, SkipReason, VisibleObjectProjector,
};
pub use placement::{object_alpha, sprite_blend, view_relative_line, MAX_OBJECT_RADIUS};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RenderConfig;
    use crate::foundation::math::{BinaryAngle, Rgb, Vec2, Vec3};
    use crate::render::api::scene::{
        AnimState, FlareTexture, LightSource, MaterialInfo, ModelFlags, ModelId, ModelSelection,
        ObjectFlags, ObjectId, Occlusion, RegionId, RegionPlanes, SceneObject, StateId, StateLight,
        ViewPlayer, ViewState, WeaponSprite,
    };
    use crate::render::frame::FrameContext;
    use crate::render::lighting::LightAdaptation;
    use crate::render::sprites::SpriteFrameTable;
    use crate::render::vissprite::{VisPayload, WeaponRecord};
    use crate::scene::{AngleClipper, MemoryScene, Region};
    use approx::assert_relative_eq;

    struct Blind;

    impl Occlusion for Blind {
        fn is_segment_visible(&self, _from: Vec2, _to: Vec2) -> bool {
            false
        }
    }

    struct Fixture {
        scene: MemoryScene,
        region: RegionId,
        table: SpriteFrameTable,
        view: ViewState,
        adaptation: LightAdaptation,
        config: RenderConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scene = MemoryScene::new();
            let region = scene.add_region(
                Region::new(Vec2::new(-1000.0, -1000.0), Vec2::new(1000.0, 1000.0), RegionPlanes::flat(0.0, 256.0))
                    .with_light(0.5, Rgb::new(1.0, 1.0, 1.0)),
            );
            scene.add_sprite_patch("TROOA0", MaterialInfo::sprite(32.0, 64.0));
            let table = SpriteFrameTable::build(&scene).unwrap();
            Self {
                scene,
                region,
                table,
                view: ViewState::new(Vec3::new(0.0, 0.0, 41.0), BinaryAngle(0)),
                adaptation: LightAdaptation::default(),
                config: RenderConfig::default(),
            }
        }

        fn object(&self, id: u32, x: f32) -> SceneObject {
            SceneObject::new(ObjectId(id), Vec3::new(x, 0.0, 0.0), self.region)
                .with_state(AnimState::new(StateId(1), 0, 0))
        }

        fn project_with(&self, occlusion: &dyn Occlusion, objects: &[SceneObject]) -> (FrameContext, ProjectionSummary) {
            let projector = VisibleObjectProjector::new(
                self.scene.interfaces(occlusion),
                &self.table,
                &self.view,
                &self.adaptation,
                &self.config,
            );
            let mut frame = FrameContext::new(64);
            frame.begin_frame();
            let summary = projector.project_objects(&mut frame, objects);
            (frame, summary)
        }

        fn project(&self, objects: &[SceneObject]) -> (FrameContext, ProjectionSummary) {
            self.project_with(&AngleClipper::new(), objects)
        }

        fn weapons(&self, player: &ViewPlayer) -> FrameContext {
            let clipper = AngleClipper::new();
            let projector = VisibleObjectProjector::new(
                self.scene.interfaces(&clipper),
                &self.table,
                &self.view,
                &self.adaptation,
                &self.config,
            );
            let mut frame = FrameContext::new(64);
            frame.begin_frame();
            projector.project_weapons(&mut frame, player);
            frame
        }
    }

    fn only_record(frame: &FrameContext) -> &crate::render::vissprite::VisSprite {
        assert_eq!(frame.vissprites().len(), 1);
        &frame.vissprites().records()[0]
    }

    #[test]
    fn test_sprite_stands_on_floor() {
        let fixture = Fixture::new();
        let (frame, summary) = fixture.project(&[fixture.object(1, 100.0)]);
        assert_eq!(summary.sprites, 1);

        let record = only_record(&frame);
        assert_relative_eq!(record.distance, 100.0);
        assert_relative_eq!(record.center, Vec3::new(100.0, 0.0, 32.0));
        let VisPayload::Sprite(sprite) = &record.payload else {
            panic!("expected a sprite");
        };
        assert_relative_eq!(sprite.gzt, 64.0);
        assert_relative_eq!(sprite.view_offset, 0.0);
        assert!(!sprite.lights.is_none());
        assert_relative_eq!(sprite.ambient.w, 1.0);
    }

    #[test]
    fn test_invisible_objects_produce_nothing() {
        let mut fixture = Fixture::new();
        let hidden = fixture.object(1, 100.0).with_flags(ObjectFlags::DONT_DRAW);
        let mut clear = fixture.object(2, 100.0);
        clear.translucency = 255;
        let mut stateless = fixture.object(3, 100.0);
        stateless.state = None;
        let mut bad_frame = fixture.object(4, 100.0);
        bad_frame.state = Some(AnimState::new(StateId(1), 0, 5));

        let (frame, summary) = fixture.project(&[hidden, clear, stateless, bad_frame]);
        assert!(frame.vissprites().is_empty());
        assert_eq!(summary.skipped, 4);

        if let Some(region) = fixture.scene.region_mut(fixture.region) {
            region.planes = RegionPlanes::flat(64.0, 64.0);
        }
        let (frame, _) = fixture.project(&[fixture.object(5, 100.0)]);
        assert!(frame.vissprites().is_empty());
    }

    #[test]
    fn test_full_bright_state_skips_lighting() {
        let fixture = Fixture::new();
        let mut object = fixture.object(1, 100.0);
        object.state = object.state.map(AnimState::full_bright);

        let (frame, _) = fixture.project(&[object]);
        let VisPayload::Sprite(sprite) = &only_record(&frame).payload else {
            panic!("expected a sprite");
        };
        assert!(sprite.lights.is_none());
        assert_relative_eq!(sprite.ambient.x, 1.0);
        assert_relative_eq!(sprite.ambient.y, 1.0);
        assert_relative_eq!(sprite.ambient.z, 1.0);
    }

    #[test]
    fn test_occluded_sprite_is_culled_but_near_model_is_kept() {
        let mut fixture = Fixture::new();
        let (frame, summary) = fixture.project_with(&Blind, &[fixture.object(1, 100.0)]);
        assert!(frame.vissprites().is_empty());
        assert_eq!(summary.skipped, 1);

        fixture.scene.set_model(
            StateId(1),
            ModelSelection {
                model: ModelId(7),
                next: None,
                inter: 0.0,
                flags: ModelFlags::empty(),
                visual_radius: 20.0,
            },
        );
        let (frame, summary) =
            fixture.project_with(&Blind, &[fixture.object(1, 100.0), fixture.object(2, 300.0)]);
        assert_eq!(summary.models, 1);
        assert_eq!(summary.skipped, 1);
        assert!(matches!(only_record(&frame).payload, VisPayload::Model(_)));
    }

    #[test]
    fn test_model_beyond_max_distance_falls_back_to_sprite() {
        let mut fixture = Fixture::new();
        fixture.config.sprites.max_model_distance = 200.0;
        fixture.scene.set_model(
            StateId(1),
            ModelSelection {
                model: ModelId(7),
                next: None,
                inter: 0.0,
                flags: ModelFlags::ALIGN_YAW,
                visual_radius: 20.0,
            },
        );

        let (_, summary) = fixture.project(&[fixture.object(1, 100.0), fixture.object(2, 500.0)]);
        assert_eq!(summary.models, 1);
        assert_eq!(summary.sprites, 1);
    }

    #[test]
    fn test_each_object_is_projected_once_per_frame() {
        let fixture = Fixture::new();
        let object = fixture.object(1, 100.0);
        let (frame, summary) = fixture.project(&[object.clone(), object]);
        assert_eq!(frame.vissprites().len(), 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_attached_light_adds_flare_at_same_distance() {
        let mut fixture = Fixture::new();
        let light = fixture.scene.add_light(LightSource::omni(
            Vec3::new(200.0, 0.0, 0.0),
            Rgb::new(1.0, 0.5, 0.0),
            64.0,
        ));
        let mut object = fixture.object(1, 200.0);
        object.attached_light = Some(light);
        object.state = object.state.map(|mut state| {
            state.light = Some(StateLight {
                flare: FlareTexture::Disabled,
                ..StateLight::default()
            });
            state
        });

        let (frame, summary) = fixture.project(&[object]);
        assert_eq!(summary.flares, 1);
        let records = frame.vissprites().records();
        assert_eq!(records.len(), 2);
        assert_relative_eq!(records[1].distance, records[0].distance);

        let VisPayload::Flare(flare) = &records[1].payload else {
            panic!("expected a flare");
        };
        assert_relative_eq!(flare.size, 60.0);
        assert_relative_eq!(flare.color, Rgb::new(1.0, 0.5, 0.0));
        assert!(flare.flags.contains(crate::render::api::scene::FlareFlags::NO_PRIMARY));
    }

    #[test]
    fn test_sky_fix_rises_above_tallest_sprite() {
        let mut fixture = Fixture::new();
        if let Some(region) = fixture.scene.region_mut(fixture.region) {
            region.sky_ceiling = true;
        }
        let mut camera = fixture.object(2, 50.0);
        camera.is_camera = true;
        camera.position.z = 100.0;

        let (frame, _) = fixture.project(&[fixture.object(1, 100.0), camera]);
        assert_relative_eq!(frame.sky_fix_ceiling(), 80.0);
    }

    #[test]
    fn test_region_projection_applies_sky_fix_per_linking_region() {
        let mut fixture = Fixture::new();
        let sky = fixture.scene.add_region(
            Region::new(Vec2::new(1000.0, -1000.0), Vec2::new(2000.0, 1000.0), RegionPlanes::flat(0.0, 256.0))
                .with_sky(),
        );

        let clipper = AngleClipper::new();
        let projector = VisibleObjectProjector::new(
            fixture.scene.interfaces(&clipper),
            &fixture.table,
            &fixture.view,
            &fixture.adaptation,
            &fixture.config,
        );
        let mut frame = FrameContext::new(64);
        frame.begin_frame();
        let objects = [fixture.object(1, 100.0)];

        let first = projector.project_region(&mut frame, fixture.region, &objects);
        let second = projector.project_region(&mut frame, sky, &objects);
        assert_eq!(first.sprites, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(frame.vissprites().len(), 1);
        assert_relative_eq!(frame.sky_fix_ceiling(), 80.0);
    }

    /// Yaw and pitch of `object` drawn as a model with `flags`
    fn model_orientation(fixture: &mut Fixture, flags: ModelFlags, object: SceneObject) -> (f32, f32) {
        fixture.scene.set_model(
            StateId(1),
            ModelSelection {
                model: ModelId(7),
                next: None,
                inter: 0.0,
                flags,
                visual_radius: 20.0,
            },
        );
        let (frame, _) = fixture.project(&[object]);
        let VisPayload::Model(params) = &only_record(&frame).payload else {
            panic!("expected a model");
        };
        (params.yaw, params.pitch)
    }

    #[test]
    fn test_model_yaw_follows_facing() {
        let mut fixture = Fixture::new();
        let mut object = fixture.object(1, 100.0);
        object.heading = BinaryAngle(BinaryAngle::ANG90);
        object.visual_heading = BinaryAngle(BinaryAngle::ANG45);

        let (yaw, pitch) = model_orientation(&mut fixture, ModelFlags::empty(), object.clone());
        assert_relative_eq!(yaw, -45.0, epsilon = 1e-4);
        assert_relative_eq!(pitch, 0.0);

        fixture.view.net_game = true;
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::empty(), object.clone());
        assert_relative_eq!(yaw, -90.0, epsilon = 1e-4);

        fixture.view.net_game = false;
        fixture.config.sprites.use_srvo_angle = false;
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::empty(), object);
        assert_relative_eq!(yaw, -90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_model_yaw_flags() {
        let mut fixture = Fixture::new();
        fixture.view.map_time = 2.0;
        let mut object = fixture.object(361, 100.0);
        object.momentum = Vec3::new(0.0, -2.0, 0.0);

        // Facing the viewer from straight ahead.
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::ALIGN_YAW, object.clone());
        assert_relative_eq!(yaw, 180.0, epsilon = 1e-3);

        // 70 degrees per second of map time, phase shifted by the id.
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::SPIN, object.clone());
        assert_relative_eq!(yaw, 141.0, epsilon = 1e-3);
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::SPIN | ModelFlags::ID_ANGLE, object.clone());
        assert_relative_eq!(yaw, 142.0, epsilon = 1e-3);

        fixture.config.sprites.model_spin_speed = 0.5;
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::SPIN, object.clone());
        assert_relative_eq!(yaw, 71.0, epsilon = 1e-3);

        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::MOVEMENT_YAW, object.clone());
        assert_relative_eq!(yaw, 90.0, epsilon = 1e-3);

        object.heading = BinaryAngle(0);
        object.visual_heading = BinaryAngle(0);
        let (yaw, _) = model_orientation(&mut fixture, ModelFlags::ID_ANGLE, object);
        assert_relative_eq!(yaw, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_model_pitch_flags() {
        let mut fixture = Fixture::new();
        fixture.view.position.z = 0.0;
        let mut object = fixture.object(1, 100.0);
        object.momentum = Vec3::new(3.0, 4.0, 5.0);

        // Aimed at the middle of the 64 unit tall frame, 32 above the eye.
        let (_, pitch) = model_orientation(&mut fixture, ModelFlags::ALIGN_PITCH, object.clone());
        assert_relative_eq!(pitch, -(0.32_f32).atan().to_degrees(), epsilon = 1e-3);

        let (_, pitch) = model_orientation(&mut fixture, ModelFlags::MOVEMENT_PITCH, object.clone());
        assert_relative_eq!(pitch, 45.0, epsilon = 1e-3);

        let (_, pitch) = model_orientation(&mut fixture, ModelFlags::MOVEMENT_YAW, object);
        assert_relative_eq!(pitch, 0.0);
    }

    #[test]
    fn test_weapon_sprite_placement() {
        let fixture = Fixture::new();
        let mut player = ViewPlayer {
            region: fixture.region,
            is_camera: false,
            weapons: vec![WeaponSprite {
                state: Some(AnimState::new(StateId(9), 0, 0)),
                tics: 4,
                position: Vec2::new(1.0, 32.0),
                alpha: 1.0,
                full_bright: false,
            }],
        };

        let frame = fixture.weapons(&player);
        let [WeaponRecord::Sprite(sprite)] = frame.weapons() else {
            panic!("expected one weapon sprite");
        };
        assert_relative_eq!(sprite.position, Vec2::new(-15.0, -32.0));
        assert!(!sprite.lights.is_none());

        player.is_camera = true;
        assert!(fixture.weapons(&player).weapons().is_empty());
    }

    #[test]
    fn test_weapon_model_offsets() {
        let mut fixture = Fixture::new();
        fixture.view.fov = 110.0;
        fixture.scene.set_model(
            StateId(9),
            ModelSelection {
                model: ModelId(3),
                next: None,
                inter: 0.0,
                flags: ModelFlags::empty(),
                visual_radius: 0.0,
            },
        );
        let player = ViewPlayer {
            region: fixture.region,
            is_camera: false,
            weapons: vec![WeaponSprite {
                state: Some(AnimState::new(StateId(9), 0, 0).full_bright()),
                tics: 4,
                position: Vec2::new(0.0, 32.0),
                alpha: 0.5,
                full_bright: false,
            }],
        };

        let frame = fixture.weapons(&player);
        let [WeaponRecord::Model { center, params }] = frame.weapons() else {
            panic!("expected one weapon model");
        };
        assert_relative_eq!(*center, fixture.view.position);
        assert_relative_eq!(params.yaw, 90.0);
        assert_relative_eq!(params.yaw_offset, -90.0);
        assert_relative_eq!(params.pitch_offset, -10.0, epsilon = 1e-4);
        assert!(params.full_bright);
        assert!(params.view_aligned);
        assert_relative_eq!(params.ambient.w, 0.5);
    }
}
