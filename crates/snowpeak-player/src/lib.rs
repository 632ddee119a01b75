//! Avatar entities and the controllers that move them: keyboard-driven
//! movement with collision for the local player, network-target smoothing for
//! remote players, and the walk cycle both share.

pub mod angle;
pub mod animation;
pub mod collision;
pub mod entity;
pub mod local_controller;
pub mod remote_controller;
pub mod scene;

pub use angle::{heading_yaw, lerp_angle, shortest_delta, wrap_angle};
pub use animation::{AvatarPose, WalkCycle};
pub use collision::{Aabb, CollisionQuery, ObstacleId, ObstacleSet, RayHit};
pub use entity::{Entity, EntityKind};
pub use local_controller::{LocalController, LocalMovement};
pub use remote_controller::RemoteController;
pub use scene::{AvatarDescriptor, HeadlessScene, RenderHandle, SceneMembership, attach, detach};
