//! Movement key bindings: held keys → planar input direction.

use glam::Vec2;
use winit::keyboard::KeyCode;

use crate::keyboard::KeyboardState;

/// Keys bound to each planar movement direction.
///
/// "Forward" walks toward -z, matching a camera that looks down +z from
/// behind the room.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementBindings {
    /// Keys moving toward -z.
    pub forward: Vec<KeyCode>,
    /// Keys moving toward +z.
    pub back: Vec<KeyCode>,
    /// Keys moving toward -x.
    pub left: Vec<KeyCode>,
    /// Keys moving toward +x.
    pub right: Vec<KeyCode>,
}

impl Default for MovementBindings {
    fn default() -> Self {
        Self {
            forward: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            back: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
        }
    }
}

impl MovementBindings {
    /// Samples the keyboard once and returns the raw (unnormalized) input
    /// direction. `x` maps to world x, `y` to world z. Opposite keys cancel.
    #[must_use]
    pub fn direction(&self, keyboard: &KeyboardState) -> Vec2 {
        let held = |keys: &[KeyCode]| keys.iter().any(|&k| keyboard.is_code_pressed(k));

        let mut dir = Vec2::ZERO;
        if held(&self.forward) {
            dir.y -= 1.0;
        }
        if held(&self.back) {
            dir.y += 1.0;
        }
        if held(&self.left) {
            dir.x -= 1.0;
        }
        if held(&self.right) {
            dir.x += 1.0;
        }
        dir
    }
}
