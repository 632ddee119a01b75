//! Keyboard-driven movement for the local avatar.
//!
//! Each tick the input direction is normalized into a heading, a ray is cast
//! from the body center along it, and the avatar advances only if nothing is
//! closer than the clearance distance. Facing always eases toward the latest
//! heading along the shortest arc, whether or not the move was allowed.

use glam::{Vec2, Vec3};
use snowpeak_config::MovementConfig;

use crate::angle::{heading_yaw, lerp_angle};
use crate::collision::CollisionQuery;
use crate::entity::Entity;

/// Tuning for [`LocalController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalMovement {
    /// World units per second.
    pub speed: f32,
    /// Minimum free distance ahead required to move.
    pub clearance: f32,
    /// Height of the ray origin above the ground position.
    pub body_offset: f32,
    /// Fraction of the remaining turn applied per tick.
    pub turn_lerp: f32,
}

impl Default for LocalMovement {
    fn default() -> Self {
        Self::from(&MovementConfig::default())
    }
}

impl From<&MovementConfig> for LocalMovement {
    fn from(config: &MovementConfig) -> Self {
        Self {
            speed: config.speed,
            clearance: config.clearance,
            body_offset: config.body_offset,
            turn_lerp: config.turn_lerp,
        }
    }
}

/// Drives the local entity from input.
#[derive(Clone, Debug, Default)]
pub struct LocalController {
    /// Speed, clearance and turn tuning.
    pub movement: LocalMovement,
}

impl LocalController {
    /// Controller with the given tuning.
    pub fn new(movement: LocalMovement) -> Self {
        Self { movement }
    }

    /// Advance `entity` by one tick.
    ///
    /// `input.x` maps to world x and `input.y` to world z. `dt` must already
    /// be clamped by the caller. Returns `true` only if the entity was
    /// actually displaced; a move blocked by an obstacle reports idle.
    pub fn step(
        &self,
        entity: &mut Entity,
        dt: f32,
        obstacles: &dyn CollisionQuery,
        input: Vec2,
    ) -> bool {
        let mut moved = false;

        if input.length_squared() > 0.0 {
            let heading = input.normalize();
            let dir = Vec3::new(heading.x, 0.0, heading.y);
            entity.target_facing_angle = heading_yaw(dir.x, dir.z);

            let origin = entity.position + Vec3::Y * self.movement.body_offset;
            let blocked = obstacles
                .query_ray(origin, dir)
                .is_some_and(|hit| hit.distance < self.movement.clearance);

            if !blocked {
                entity.position += dir * self.movement.speed * dt;
                entity.target_position = entity.position;
                moved = true;
            }
        }

        entity.facing_angle = lerp_angle(
            entity.facing_angle,
            entity.target_facing_angle,
            self.movement.turn_lerp,
        );
        entity.walk.update(dt, moved);
        moved
    }
}
