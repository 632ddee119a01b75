//! Room membership and the remote entities that mirror it.
//!
//! The registry keeps two maps keyed by player id:
//!
//! - **membership**: who is in the room, with the last payload seen for them;
//! - **live**: the remote [`Entity`] registered with the scene for each member.
//!
//! Network traffic only ever edits membership (joins and leaves) or retargets a
//! live entity in place (position churn). Entities are created and disposed in
//! [`PlayerRegistry::reconcile`], which the simulation runs only after
//! membership changed. After a reconcile both maps share the same key set.

use std::collections::HashMap;

use snowpeak_net::{GameMessage, PlayerState};
use snowpeak_player::{Entity, SceneMembership, attach, detach};

/// What a single incoming state did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Echo of the local player, or a message that carries no player.
    Ignored,
    /// A live entity's target moved; membership untouched.
    Retargeted,
    /// A new member was added; an entity spawns on the next reconcile.
    Joined,
    /// A member that is not live yet got a fresher payload.
    Refreshed,
    /// A member was removed; its entity is disposed on the next reconcile.
    Left,
    /// Leave for an unknown id.
    UnknownLeave,
}

impl UpdateOutcome {
    /// True for outcomes that change membership.
    pub fn changes_membership(self) -> bool {
        matches!(self, UpdateOutcome::Joined | UpdateOutcome::Left)
    }
}

/// Entities created and disposed by one reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub spawned: Vec<String>,
    pub despawned: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.despawned.is_empty()
    }
}

/// Authoritative local record of who is in the room.
#[derive(Debug)]
pub struct PlayerRegistry {
    local_id: String,
    membership: HashMap<String, PlayerState>,
    live: HashMap<String, Entity>,
    dirty: bool,
    membership_revision: u64,
}

impl PlayerRegistry {
    /// Registry for a client whose own player id is `local_id`. Messages
    /// about that id are ignored.
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            membership: HashMap::new(),
            live: HashMap::new(),
            dirty: false,
            membership_revision: 0,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Apply a decoded room message.
    ///
    /// Sync batches run every contained state through the same path and
    /// report [`UpdateOutcome::Joined`] if any of them added a member.
    /// Chat frames are ignored.
    pub fn handle_incoming_update(&mut self, message: &GameMessage) -> UpdateOutcome {
        match message {
            GameMessage::Join(state) | GameMessage::Update(state) => self.apply(state, false),
            GameMessage::Leave(state) => self.apply(state, true),
            GameMessage::Sync(states) => {
                let mut joined = false;
                for state in states {
                    joined |= self.apply(state, false) == UpdateOutcome::Joined;
                }
                if joined {
                    UpdateOutcome::Joined
                } else {
                    UpdateOutcome::Retargeted
                }
            }
            GameMessage::Chat(_) => UpdateOutcome::Ignored,
        }
    }

    /// Apply one player's state. `leave` marks a departure.
    pub fn apply(&mut self, state: &PlayerState, leave: bool) -> UpdateOutcome {
        let id = state.player_id.as_str();
        if id == self.local_id {
            return UpdateOutcome::Ignored;
        }

        if leave {
            if self.membership.remove(id).is_some() {
                tracing::info!("{id} left the room");
                self.mark_changed();
                return UpdateOutcome::Left;
            }
            tracing::debug!("Leave for unknown player {id}");
            return UpdateOutcome::UnknownLeave;
        }

        if let Some(entity) = self.live.get_mut(id) {
            entity.apply_target(state);
            if self.membership.contains_key(id) {
                return UpdateOutcome::Retargeted;
            }
            // Left earlier in this tick and came back before the entity was
            // disposed: keep the entity, restore membership.
            self.membership.insert(id.to_string(), state.clone());
            self.mark_changed();
            return UpdateOutcome::Joined;
        }

        match self.membership.get_mut(id) {
            Some(payload) => {
                *payload = state.clone();
                UpdateOutcome::Refreshed
            }
            None => {
                tracing::info!("{} joined the room", state.nickname);
                self.membership.insert(id.to_string(), state.clone());
                self.mark_changed();
                UpdateOutcome::Joined
            }
        }
    }

    fn mark_changed(&mut self) {
        self.dirty = true;
        self.membership_revision += 1;
    }

    /// True when membership changed since the last reconcile.
    pub fn needs_reconcile(&self) -> bool {
        self.dirty
    }

    /// Count of membership changes so far.
    pub fn membership_revision(&self) -> u64 {
        self.membership_revision
    }

    /// Bring live entities in line with membership.
    pub fn reconcile(&mut self, scene: &mut dyn SceneMembership) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let mut missing: Vec<&String> = self
            .membership
            .keys()
            .filter(|id| !self.live.contains_key(*id))
            .collect();
        missing.sort();
        for id in missing {
            let Some(state) = self.membership.get(id) else {
                continue;
            };
            let mut entity = Entity::remote(state);
            attach(scene, &mut entity);
            report.spawned.push(id.clone());
            self.live.insert(id.clone(), entity);
        }

        let mut stale: Vec<String> = self
            .live
            .keys()
            .filter(|id| !self.membership.contains_key(*id))
            .cloned()
            .collect();
        stale.sort();
        for id in stale {
            if let Some(mut entity) = self.live.remove(&id) {
                detach(scene, &mut entity);
                report.despawned.push(id);
            }
        }

        self.dirty = false;
        if !report.is_empty() {
            tracing::debug!(
                "Reconciled: +{} -{} ({} live)",
                report.spawned.len(),
                report.despawned.len(),
                self.live.len()
            );
        }
        report
    }

    /// Dispose every remote entity and forget all members.
    pub fn clear(&mut self, scene: &mut dyn SceneMembership) {
        for (_, mut entity) in self.live.drain() {
            detach(scene, &mut entity);
        }
        if !self.membership.is_empty() {
            self.membership.clear();
            self.membership_revision += 1;
        }
        self.dirty = false;
    }

    pub fn is_member(&self, id: &str) -> bool {
        self.membership.contains_key(id)
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.live.contains_key(id)
    }

    pub fn member_count(&self) -> usize {
        self.membership.len()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Member ids, sorted.
    pub fn member_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.membership.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Last payload stored for a member.
    pub fn payload(&self, id: &str) -> Option<&PlayerState> {
        self.membership.get(id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.live.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.live.values()
    }

    /// Live entities for the remote controller to advance.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.live.values_mut()
    }
}
