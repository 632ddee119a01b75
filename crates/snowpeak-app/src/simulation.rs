//! The per-frame orchestrator.
//!
//! [`SimulationLoop`] owns every piece of client state and advances it in a
//! fixed order each tick:
//!
//! 1. drain transport events ([`Session::poll`]); callbacks only push into
//!    channels owned by the loop;
//! 2. apply link changes (connected / failed), then inbound room, sync and
//!    chat messages;
//! 3. reconcile scene membership if it changed;
//! 4. sample input and run the local controller;
//! 5. offer the local state to the publisher and send what it emits;
//! 6. advance every remote entity toward its target.
//!
//! Rendering happens after `tick` returns.

use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::Vec3;
use snowpeak_config::Config;
use snowpeak_input::{KeyboardState, MovementBindings};
use snowpeak_multiplayer::{ChatLog, PlayerRegistry, StatePublisher, prepare_outgoing};
use snowpeak_net::{
    ChatLine, ConnectionState, GameMessage, PlayerRole, Session, SubscriptionHandle, Transport,
    TransportError,
};
use snowpeak_player::{
    CollisionQuery, Entity, LocalController, LocalMovement, RemoteController, SceneMembership,
    attach, detach,
};
use tracing::{debug, info, warn};

/// Connection status as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// `start` not called yet.
    Idle,
    /// Waiting for the broker.
    Connecting,
    /// Connected and announced.
    Online,
    /// The connection attempt failed. [`SimulationLoop::retry`] tries again.
    Failed(String),
    /// The broker dropped an established connection.
    Lost,
    /// Torn down by [`SimulationLoop::shutdown`].
    Closed,
}

/// Counters from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub messages: usize,
    pub spawned: usize,
    pub despawned: usize,
    pub local_moving: bool,
    pub published: bool,
}

enum LinkEvent {
    Connected,
    Failed(TransportError),
}

/// Client simulation over a transport `T`, a scene `S` and obstacles `C`.
pub struct SimulationLoop<T: Transport, S: SceneMembership, C: CollisionQuery> {
    config: Config,
    session: Session<T>,
    scene: S,
    obstacles: C,
    keyboard: KeyboardState,
    bindings: MovementBindings,
    local: Option<Entity>,
    local_controller: LocalController,
    remote_controller: RemoteController,
    registry: PlayerRegistry,
    publisher: StatePublisher,
    chat: ChatLog,
    subscriptions: Vec<SubscriptionHandle>,
    inbound_tx: Sender<GameMessage>,
    inbound_rx: Receiver<GameMessage>,
    link_tx: Sender<LinkEvent>,
    link_rx: Receiver<LinkEvent>,
    status: LinkStatus,
    running: bool,
    tick_count: u64,
}

impl<T: Transport, S: SceneMembership, C: CollisionQuery> SimulationLoop<T, S, C> {
    /// Build the loop and place the local avatar at `spawn`.
    ///
    /// The player id is the configured nickname; an unknown role falls back
    /// to the default role.
    pub fn new(config: Config, transport: T, mut scene: S, obstacles: C, spawn: Vec3) -> Self {
        let role = PlayerRole::from_wire(&config.player.role).unwrap_or_default();
        let mut local = Entity::local(&config.player.nickname, role, spawn);
        attach(&mut scene, &mut local);

        let (inbound_tx, inbound_rx) = unbounded();
        let (link_tx, link_rx) = unbounded();

        Self {
            local_controller: LocalController::new(LocalMovement::from(&config.movement)),
            remote_controller: RemoteController::from(&config.remote),
            publisher: StatePublisher::from(&config.publisher),
            registry: PlayerRegistry::new(local.id.clone()),
            local: Some(local),
            session: Session::new(transport),
            scene,
            obstacles,
            keyboard: KeyboardState::new(),
            bindings: MovementBindings::default(),
            chat: ChatLog::new(),
            subscriptions: Vec::new(),
            inbound_tx,
            inbound_rx,
            link_tx,
            link_rx,
            status: LinkStatus::Idle,
            running: false,
            tick_count: 0,
            config,
        }
    }

    /// Queue the room, sync and chat subscriptions and connect.
    ///
    /// Subscriptions are requested before the connection exists; the session
    /// replays them as soon as the broker accepts.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.local.is_none() {
            warn!("Cannot restart a simulation that was shut down");
            return;
        }
        self.running = true;

        let net = &self.config.network;
        let topics = [
            net.room_topic(),
            net.sync_topic(self.registry.local_id()),
            net.chat_topic.clone(),
        ];
        for topic in topics {
            let tx = self.inbound_tx.clone();
            let handle = self.session.subscribe(&topic, move |msg| {
                let _ = tx.send(msg);
            });
            self.subscriptions.push(handle);
        }

        info!(
            "Starting as {} in room {}",
            self.registry.local_id(),
            self.config.network.room_id
        );
        self.connect();
    }

    /// Reconnect after a failed or lost connection.
    pub fn retry(&mut self) {
        if self.running && matches!(self.status, LinkStatus::Failed(_) | LinkStatus::Lost) {
            info!("Retrying connection");
            self.connect();
        }
    }

    fn connect(&mut self) {
        self.status = LinkStatus::Connecting;
        let ok = self.link_tx.clone();
        let err = self.link_tx.clone();
        let endpoint = self.config.network.endpoint.clone();
        self.session.connect(
            &endpoint,
            move || {
                let _ = ok.send(LinkEvent::Connected);
            },
            move |e| {
                let _ = err.send(LinkEvent::Failed(e));
            },
        );
    }

    /// Run one frame. `dt` must already be clamped; `now` drives the
    /// publisher's rate limit.
    pub fn tick(&mut self, dt: f32, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if !self.running {
            return report;
        }

        self.session.poll();
        self.apply_link_events();
        report.messages = self.apply_inbound();

        if self.registry.needs_reconcile() {
            let changes = self.registry.reconcile(&mut self.scene);
            report.spawned = changes.spawned.len();
            report.despawned = changes.despawned.len();
        }

        let input = self.bindings.direction(&self.keyboard);
        if let Some(local) = self.local.as_mut() {
            report.local_moving = self.local_controller.step(local, dt, &self.obstacles, input);

            if self.session.is_connected()
                && let Some(state) =
                    self.publisher
                        .poll(local, report.local_moving, &self.config.network.room_id, now)
            {
                report.published = self
                    .session
                    .send_message(&self.config.network.update_destination, &GameMessage::Update(state));
            }
        }

        for entity in self.registry.entities_mut() {
            self.remote_controller.update(entity, dt);
        }

        self.tick_count += 1;
        report
    }

    fn apply_link_events(&mut self) {
        while let Ok(event) = self.link_rx.try_recv() {
            match event {
                LinkEvent::Connected => {
                    self.status = LinkStatus::Online;
                    self.publisher.reset();
                    self.announce_join();
                }
                LinkEvent::Failed(err) => {
                    warn!("Could not connect: {err}");
                    self.status = LinkStatus::Failed(err.to_string());
                }
            }
        }

        if self.status == LinkStatus::Online
            && self.session.state() == ConnectionState::Disconnected
        {
            warn!("Lost connection to broker");
            self.status = LinkStatus::Lost;
        }
    }

    fn announce_join(&mut self) {
        let Some(local) = self.local.as_ref() else {
            return;
        };
        let state = local.to_state(&self.config.network.room_id);
        info!("Joining room {} as {}", self.config.network.room_id, state.nickname);
        self.session
            .send_message(&self.config.network.join_destination, &GameMessage::Join(state));
    }

    fn apply_inbound(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.inbound_rx.try_recv() {
            handled += 1;
            match message {
                GameMessage::Chat(line) => self.chat.push(line),
                other => {
                    let outcome = self.registry.handle_incoming_update(&other);
                    debug!("{:?} -> {:?}", other.player_id(), outcome);
                }
            }
        }
        handled
    }

    /// Publish a chat line. Blank input is ignored. Returns whether the line
    /// was handed to the transport.
    pub fn send_chat(&mut self, text: &str) -> bool {
        let line: ChatLine = match prepare_outgoing(&self.config.player.nickname, text) {
            Ok(line) => line,
            Err(reason) => {
                debug!("Not sending chat: {reason:?}");
                return false;
            }
        };
        self.session
            .send_message(&self.config.network.chat_destination, &GameMessage::Chat(line))
    }

    /// Tear the client down.
    ///
    /// Order: stop ticking, announce the leave, cancel every subscription
    /// (live and queued), dispose all entities, close the transport.
    /// Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if self.status == LinkStatus::Closed {
            return;
        }
        self.running = false;

        if let Some(local) = self.local.as_ref()
            && self.session.is_connected()
        {
            let state = local.to_state(&self.config.network.room_id);
            self.session
                .send_message(&self.config.network.leave_destination, &GameMessage::Leave(state));
        }

        for handle in self.subscriptions.drain(..) {
            handle.unsubscribe();
        }
        self.session.unsubscribe_all();

        self.registry.clear(&mut self.scene);
        if let Some(mut local) = self.local.take() {
            detach(&mut self.scene, &mut local);
        }

        self.session.disconnect();
        self.status = LinkStatus::Closed;
        info!("Simulation shut down after {} ticks", self.tick_count);
    }

    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The local avatar, `None` after shutdown.
    pub fn local(&self) -> Option<&Entity> {
        self.local.as_ref()
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Obstacles may change at runtime (doors, furniture).
    pub fn obstacles_mut(&mut self) -> &mut C {
        &mut self.obstacles
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
