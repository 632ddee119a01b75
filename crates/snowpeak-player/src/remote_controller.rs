//! Interpolation of remote avatars toward their last network target.

use snowpeak_config::RemoteConfig;

use crate::angle::lerp_angle;
use crate::entity::Entity;

/// Time-based exponential smoothing toward a network target.
///
/// `alpha = 1 - exp(-smoothing * dt)` is frame-rate independent: two ticks of
/// `dt` cover the same ground as one tick of `2 * dt`. The controller never
/// creates, removes or renames entities; calling it without fresh data simply
/// converges and holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RemoteController {
    /// Smoothing rate `k`, per second.
    pub smoothing: f32,
    /// Squared distance to target above which the entity counts as moving.
    pub moving_epsilon_sq: f32,
}

impl Default for RemoteController {
    fn default() -> Self {
        Self::from(&RemoteConfig::default())
    }
}

impl From<&RemoteConfig> for RemoteController {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            smoothing: config.smoothing,
            moving_epsilon_sq: config.moving_epsilon_sq,
        }
    }
}

impl RemoteController {
    /// Blend factor for a tick of `dt` seconds.
    pub fn alpha(&self, dt: f32) -> f32 {
        1.0 - (-self.smoothing * dt).exp()
    }

    /// Advance `entity` toward its target. Returns whether it is still moving.
    pub fn update(&self, entity: &mut Entity, dt: f32) -> bool {
        let alpha = self.alpha(dt);
        entity.position = entity.position.lerp(entity.target_position, alpha);
        entity.facing_angle = lerp_angle(entity.facing_angle, entity.target_facing_angle, alpha);

        let moving = self.is_moving(entity);
        entity.walk.update(dt, moving);
        moving
    }

    /// True while the entity is further than the epsilon from its target.
    pub fn is_moving(&self, entity: &Entity) -> bool {
        entity.position.distance_squared(entity.target_position) > self.moving_epsilon_sq
    }
}
