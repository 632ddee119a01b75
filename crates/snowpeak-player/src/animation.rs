//! Procedural walk cycle driven by the moving/idle signal.

/// Rest height of the body above the ground.
pub const REST_BODY_HEIGHT: f32 = 0.5;
/// Phase advance per second while walking.
pub const WALK_RATE: f32 = 12.0;
/// Peak leg swing in radians.
pub const LEG_SWING: f32 = 0.8;
/// Peak bob above rest height.
pub const BODY_BOB: f32 = 0.2;
/// Peak side-to-side roll in radians.
pub const BODY_ROLL: f32 = 0.1;
/// Fraction of the way back to rest covered per idle tick.
pub const IDLE_RELAX: f32 = 0.1;

/// Pose channels a renderer applies to an avatar rig.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AvatarPose {
    /// Leg rotation about x. The left leg uses `+leg_swing`, the right `-leg_swing`.
    pub leg_swing: f32,
    /// Body height above the entity's ground position.
    pub body_height: f32,
    /// Body rotation about z.
    pub body_roll: f32,
}

impl Default for AvatarPose {
    fn default() -> Self {
        Self {
            leg_swing: 0.0,
            body_height: REST_BODY_HEIGHT,
            body_roll: 0.0,
        }
    }
}

/// Walk cycle state of one avatar.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WalkCycle {
    phase: f32,
    pose: AvatarPose,
}

impl WalkCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds.
    ///
    /// Moving advances the phase and swings the rig; idle eases every channel
    /// back toward its rest value without resetting the phase.
    pub fn update(&mut self, dt: f32, moving: bool) {
        if moving {
            self.phase += dt * WALK_RATE;
            let t = self.phase;
            self.pose = AvatarPose {
                leg_swing: t.sin() * LEG_SWING,
                body_height: REST_BODY_HEIGHT + t.cos().abs() * BODY_BOB,
                body_roll: (t * 0.5).sin() * BODY_ROLL,
            };
        } else {
            let rest = AvatarPose::default();
            self.pose.leg_swing += (rest.leg_swing - self.pose.leg_swing) * IDLE_RELAX;
            self.pose.body_height += (rest.body_height - self.pose.body_height) * IDLE_RELAX;
            self.pose.body_roll += (rest.body_roll - self.pose.body_roll) * IDLE_RELAX;
        }
    }

    pub fn pose(&self) -> AvatarPose {
        self.pose
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_rest() {
        let walk = WalkCycle::new();
        assert_eq!(walk.pose(), AvatarPose::default());
        assert_eq!(walk.phase(), 0.0);
    }

    #[test]
    fn test_moving_advances_phase() {
        let mut walk = WalkCycle::new();
        walk.update(0.1, true);
        assert!((walk.phase() - 1.2).abs() < 1e-5);
        let pose = walk.pose();
        assert!((pose.leg_swing - 1.2_f32.sin() * 0.8).abs() < 1e-5);
        assert!(pose.body_height >= REST_BODY_HEIGHT);
        assert!(pose.body_height <= REST_BODY_HEIGHT + BODY_BOB + 1e-6);
    }

    #[test]
    fn test_idle_relaxes_toward_rest() {
        let mut walk = WalkCycle::new();
        walk.update(0.1, true);
        let swung = walk.pose().leg_swing.abs();

        walk.update(0.016, false);
        assert!(walk.pose().leg_swing.abs() < swung);

        for _ in 0..200 {
            walk.update(0.016, false);
        }
        let pose = walk.pose();
        assert!(pose.leg_swing.abs() < 1e-4);
        assert!((pose.body_height - REST_BODY_HEIGHT).abs() < 1e-4);
        assert!(pose.body_roll.abs() < 1e-4);
    }

    #[test]
    fn test_idle_keeps_phase() {
        let mut walk = WalkCycle::new();
        walk.update(0.1, true);
        walk.update(0.1, false);
        assert!((walk.phase() - 1.2).abs() < 1e-5);
    }
}
