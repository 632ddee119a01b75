//! Input surface: held-key state and movement key bindings.

pub mod keyboard;
pub mod movement;

pub use keyboard::{KeyboardState, RawKeyEvent};
pub use movement::MovementBindings;
