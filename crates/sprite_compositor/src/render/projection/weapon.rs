//! First-person weapon projection

use crate::foundation::logging::trace;
use crate::foundation::math::{Rgba, Vec2, Vec3};
use crate::render::api::scene::{ModelFlags, ViewPlayer, WeaponSprite};
use crate::render::frame::FrameContext;
use crate::render::lighting::BindRequest;
use crate::render::projection::object::VisibleObjectProjector;
use crate::render::vissprite::{ModelParams, WeaponRecord, WeaponSpriteParams};

/// Sprite height at which a weapon is fully raised
const WEAPON_TOP: f32 = 32.0;

/// Share of the view pitch a weapon model follows
const WEAPON_PITCH_SCALE: f32 = 85.0 / 110.0;

impl VisibleObjectProjector<'_> {
    /// Project the view player's weapon slots; returns records stored
    pub fn project_weapons(&self, frame: &mut FrameContext, player: &ViewPlayer) -> usize {
        if player.is_camera {
            return 0;
        }

        let all_bright = self.config().lighting.level_full_bright
            || player
                .weapons
                .iter()
                .any(|slot| slot.state.is_some_and(|state| state.is_full_bright()));

        let mut stored = 0;
        for slot in &player.weapons {
            if let Some(record) = self.weapon_record(frame, player, slot, all_bright || slot.full_bright) {
                frame.push_weapon(record);
                stored += 1;
            }
        }
        stored
    }

    fn weapon_record(
        &self,
        frame: &mut FrameContext,
        player: &ViewPlayer,
        slot: &WeaponSprite,
        full_bright: bool,
    ) -> Option<WeaponRecord> {
        let state = slot.state?;
        let view = self.view();
        let config = self.config();
        let scene = self.scene();

        let model = if config.sprites.use_models {
            scene.models.model_for(&state, slot.tics, 0)
        } else {
            None
        };

        if let Some(model) = model {
            let weapons = &config.weapons;
            let full_bright = full_bright && !model.flags.contains(ModelFlags::DIM);
            let binding = self.binder().bind(
                frame.lights_mut(),
                &BindRequest::weapon_model(view.position, player.region, full_bright),
            );

            let mut pitch_offset =
                (WEAPON_TOP - slot.position.y) * weapons.offset_scale * weapons.vertical_scale();
            if weapons.fov_shift > 0.0 && view.fov > 90.0 {
                pitch_offset -= weapons.fov_shift * (view.fov - 90.0) / 90.0;
            }

            trace!("Weapon state {:?} as model {:?}", state.id, model.model);
            return Some(WeaponRecord::Model {
                center: view.position,
                params: ModelParams {
                    model: model.model,
                    next: model.next,
                    inter: model.inter,
                    object: None,
                    yaw: view.angle.turns() * -360.0 + 90.0,
                    pitch: view.pitch * WEAPON_PITCH_SCALE,
                    yaw_offset: slot.position.x * weapons.offset_scale - 90.0,
                    pitch_offset,
                    srvo: Vec3::zeros(),
                    gzt: view.position.z,
                    ambient: Rgba::new(binding.ambient.x, binding.ambient.y, binding.ambient.z, slot.alpha),
                    lights: binding.handle,
                    full_bright,
                    view_aligned: true,
                },
            });
        }

        let (material_id, flip) = self.table().lookup(state.sprite, state.frame, 0)?;
        let material = scene.resources.material(material_id)?;
        let weapons = &config.weapons;
        let binding = self.binder().bind(
            frame.lights_mut(),
            &BindRequest::weapon_sprite(
                view.position,
                player.region,
                full_bright,
                weapons.light_multiplier,
            ),
        );

        trace!("Weapon state {:?} as sprite {}", state.id, state.sprite);
        Some(WeaponRecord::Sprite(WeaponSpriteParams {
            position: Vec2::new(
                slot.position.x - material.offset_x + weapons.offset[0],
                weapons.vertical_scale() * (slot.position.y - material.offset_y) + weapons.offset[1],
            ),
            width: material.width,
            height: material.height,
            material: material_id,
            flip,
            tex_coord: material.tex_coord,
            ambient: Rgba::new(binding.ambient.x, binding.ambient.y, binding.ambient.z, slot.alpha),
            lights: binding.handle,
        }))
    }
}
