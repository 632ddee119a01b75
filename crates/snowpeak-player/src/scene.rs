//! Boundary to whatever renders avatars.
//!
//! The simulation never touches meshes. It hands the scene an
//! [`AvatarDescriptor`] and keeps the [`RenderHandle`] it gets back;
//! removing the handle disposes the renderable.

use std::collections::BTreeMap;

use glam::Vec3;
use snowpeak_net::PlayerRole;

use crate::entity::{Entity, EntityKind};

/// Opaque handle to a renderable owned by the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderHandle(pub u64);

/// Everything needed to construct an avatar renderable.
#[derive(Clone, Debug, PartialEq)]
pub struct AvatarDescriptor {
    pub id: String,
    pub display_name: String,
    pub role: PlayerRole,
    pub kind: EntityKind,
    pub position: Vec3,
    pub facing_angle: f32,
}

/// Scene graph membership.
pub trait SceneMembership {
    /// Build and insert a renderable for `avatar`.
    fn add_entity(&mut self, avatar: &AvatarDescriptor) -> RenderHandle;

    /// Remove and dispose a renderable. Unknown handles are ignored.
    fn remove_entity(&mut self, handle: RenderHandle);
}

/// Register `entity` with the scene unless it already is.
pub fn attach(scene: &mut dyn SceneMembership, entity: &mut Entity) -> RenderHandle {
    if let Some(handle) = entity.render_handle() {
        return handle;
    }
    let handle = scene.add_entity(&entity.descriptor());
    entity.set_render_handle(Some(handle));
    handle
}

/// Remove `entity` from the scene if it is registered.
pub fn detach(scene: &mut dyn SceneMembership, entity: &mut Entity) {
    if let Some(handle) = entity.render_handle() {
        scene.remove_entity(handle);
        entity.set_render_handle(None);
    }
}

/// Scene without a renderer. Tracks membership and logs changes.
///
/// Used by the headless binary and by tests that assert on scene contents.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    members: BTreeMap<RenderHandle, AvatarDescriptor>,
    next_handle: u64,
    added: usize,
    removed: usize,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of renderables currently in the scene.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True if an avatar with `id` is in the scene.
    pub fn contains_id(&self, id: &str) -> bool {
        self.members.values().any(|a| a.id == id)
    }

    /// Count of avatars with `id`. More than one means a duplicate.
    pub fn count_id(&self, id: &str) -> usize {
        self.members.values().filter(|a| a.id == id).count()
    }

    /// Ids of every avatar in the scene, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.members.values().map(|a| a.id.clone()).collect();
        ids.sort();
        ids
    }

    /// Total `add_entity` calls so far.
    pub fn added(&self) -> usize {
        self.added
    }

    /// Total `remove_entity` calls that removed something.
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl SceneMembership for HeadlessScene {
    fn add_entity(&mut self, avatar: &AvatarDescriptor) -> RenderHandle {
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.added += 1;
        tracing::info!(
            "Scene + {} ({:?}, {}) at ({:.2}, {:.2})",
            avatar.display_name,
            avatar.kind,
            avatar.role.as_wire(),
            avatar.position.x,
            avatar.position.z
        );
        self.members.insert(handle, avatar.clone());
        handle
    }

    fn remove_entity(&mut self, handle: RenderHandle) {
        if let Some(avatar) = self.members.remove(&handle) {
            self.removed += 1;
            tracing::info!("Scene - {}", avatar.display_name);
        }
    }
}
