//! Snowpeak client application: the simulation loop that ties input,
//! movement, networking and the scene together, plus the frame clock and
//! platform directories used by the binary.

pub mod game_loop;
pub mod platform;
pub mod simulation;

pub use game_loop::{FrameClock, MAX_FRAME_TIME};
pub use platform::{PlatformDirs, PlatformError};
pub use simulation::{LinkStatus, SimulationLoop, TickReport};
