//! Avatar entities shared by the local and remote controllers.

use glam::Vec3;
use snowpeak_net::{FixedPosition, PlayerRole, PlayerState};

use crate::animation::WalkCycle;
use crate::scene::{AvatarDescriptor, RenderHandle};

/// Who drives an entity's transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// Driven by keyboard input on this client.
    Local,
    /// Driven by network updates from a peer.
    Remote,
}

/// One avatar in the room.
///
/// `position.y` stays on the ground plane; movement is planar. For remote
/// entities `target_*` holds the latest network-declared goal. For the local
/// entity the target position mirrors `position` after every successful move.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Player id, unique within a room.
    pub id: String,
    /// Name shown above the avatar.
    pub display_name: String,
    /// Role picked at login.
    pub role: PlayerRole,
    /// Local or remote.
    pub kind: EntityKind,
    /// Rendered position.
    pub position: Vec3,
    /// Yaw in radians; zero faces +z.
    pub facing_angle: f32,
    /// Latest position declared over the network.
    pub target_position: Vec3,
    /// Latest yaw declared over the network.
    pub target_facing_angle: f32,
    /// Walk animation driven by the moving flag.
    pub walk: WalkCycle,
    render: Option<RenderHandle>,
}

impl Entity {
    fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        role: PlayerRole,
        kind: EntityKind,
        position: Vec3,
        facing_angle: f32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            kind,
            position,
            facing_angle,
            target_position: position,
            target_facing_angle: facing_angle,
            walk: WalkCycle::new(),
            render: None,
        }
    }

    /// The locally controlled avatar. Its id is its nickname.
    pub fn local(nickname: &str, role: PlayerRole, spawn: Vec3) -> Self {
        Self::new(nickname, nickname, role, EntityKind::Local, spawn, 0.0)
    }

    /// A remote avatar seeded from a network payload. Position and target
    /// both start at the payload's coordinates so it does not glide in from
    /// the origin.
    pub fn remote(state: &PlayerState) -> Self {
        let position = state.world_position().unwrap_or(Vec3::ZERO);
        Self::new(
            state.player_id.clone(),
            state.nickname.clone(),
            state.role.unwrap_or_default(),
            EntityKind::Remote,
            position,
            state.direction.filter(|d| d.is_finite()).unwrap_or(0.0),
        )
    }

    /// Overwrite the network target from a payload. Missing fields keep the
    /// previous target, and so does a non-finite angle.
    pub fn apply_target(&mut self, state: &PlayerState) {
        if let Some(position) = state.world_position() {
            self.target_position = position;
        }
        if let Some(direction) = state.direction
            && direction.is_finite()
        {
            self.target_facing_angle = direction;
        }
    }

    /// Outbound snapshot of this entity for the given room.
    pub fn to_state(&self, room_id: &str) -> PlayerState {
        PlayerState {
            player_id: self.id.clone(),
            nickname: self.display_name.clone(),
            position: Some(FixedPosition::from_world(self.position)),
            direction: Some(self.facing_angle),
            role: Some(self.role),
            room_id: Some(room_id.to_string()),
        }
    }

    /// What the scene needs to build a renderable for this entity.
    pub fn descriptor(&self) -> AvatarDescriptor {
        AvatarDescriptor {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            kind: self.kind,
            position: self.position,
            facing_angle: self.facing_angle,
        }
    }

    pub fn render_handle(&self) -> Option<RenderHandle> {
        self.render
    }

    pub(crate) fn set_render_handle(&mut self, handle: Option<RenderHandle>) {
        self.render = handle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_entity_uses_nickname_as_id() {
        let e = Entity::local("mina", PlayerRole::Barista, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(e.id, "mina");
        assert_eq!(e.kind, EntityKind::Local);
        assert_eq!(e.target_position, e.position);
        assert!(e.render_handle().is_none());
    }

    #[test]
    fn test_remote_entity_seeds_position_and_target() {
        let state = PlayerState::new("jun")
            .with_position(Vec3::new(3.0, 0.0, -4.0))
            .with_direction(1.5);
        let e = Entity::remote(&state);
        assert_eq!(e.kind, EntityKind::Remote);
        assert!((e.position - Vec3::new(3.0, 0.0, -4.0)).length() < 1e-5);
        assert_eq!(e.position, e.target_position);
        assert!((e.facing_angle - 1.5).abs() < 1e-6);
        assert_eq!(e.role, PlayerRole::HallServer);
    }

    #[test]
    fn test_apply_target_leaves_transform_alone() {
        let mut e = Entity::remote(&PlayerState::new("jun"));
        e.apply_target(&PlayerState::new("jun").with_position(Vec3::new(5.0, 0.0, 5.0)));
        assert_eq!(e.position, Vec3::ZERO);
        assert!((e.target_position - Vec3::new(5.0, 0.0, 5.0)).length() < 1e-5);
        assert_eq!(e.target_facing_angle, 0.0);
    }

    #[test]
    fn test_apply_target_ignores_non_finite_direction() {
        let mut e = Entity::remote(&PlayerState::new("jun").with_direction(0.5));
        e.apply_target(&PlayerState::new("jun").with_direction(f32::NAN));
        assert_eq!(e.target_facing_angle, 0.5);
        e.apply_target(&PlayerState::new("jun").with_direction(f32::INFINITY));
        assert_eq!(e.target_facing_angle, 0.5);
        e.apply_target(&PlayerState::new("jun").with_direction(1.0));
        assert_eq!(e.target_facing_angle, 1.0);

        let fresh = Entity::remote(&PlayerState::new("kim").with_direction(f32::NAN));
        assert_eq!(fresh.facing_angle, 0.0);
    }

    #[test]
    fn test_to_state_uses_fixed_point() {
        let mut e = Entity::local("mina", PlayerRole::HallServer, Vec3::ZERO);
        e.position = Vec3::new(1.234, 0.0, -5.678);
        e.facing_angle = 0.75;
        let state = e.to_state("1");
        assert_eq!(state.position, Some(FixedPosition { x: 123, y: -568 }));
        assert_eq!(state.direction, Some(0.75));
        assert_eq!(state.room_id.as_deref(), Some("1"));
    }
}
