//! Headless Snowpeak client.
//!
//! Loads `config.ron` (overridable via CLI flags), then runs the local player
//! and a scripted peer against an in-process broker inside a walled room,
//! logging connection, membership and chat activity. No window is opened.
//!
//! Run with `cargo run -p snowpeak-app -- --nickname mina --frames 300`.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use glam::Vec3;
use snowpeak_app::{FrameClock, LinkStatus, PlatformDirs, SimulationLoop};
use snowpeak_config::{CliArgs, Config};
use snowpeak_net::{LoopbackBroker, LoopbackTransport};
use snowpeak_player::{HeadlessScene, ObstacleSet};
use tracing::{error, info};
use winit::keyboard::KeyCode;

/// Half the side length of the demo room.
const ROOM_HALF_SIZE: f32 = 12.0;
const WALL_HEIGHT: f32 = 3.0;
/// Target frame period.
const FRAME: Duration = Duration::from_millis(16);

type Client = SimulationLoop<LoopbackTransport, HeadlessScene, ObstacleSet>;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match args.config.clone() {
        Some(dir) => PlatformDirs::from_config_dir(dir),
        None => match PlatformDirs::resolve() {
            Ok(dirs) => dirs,
            Err(e) => {
                eprintln!("Failed to resolve platform directories: {e}");
                return ExitCode::FAILURE;
            }
        },
    };
    if let Err(e) = dirs.create_dirs() {
        eprintln!("Failed to create {}: {e}", dirs.config_dir.display());
    }

    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    snowpeak_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!(
        "Using in-process broker in place of {}",
        config.network.endpoint
    );

    let broker = demo_broker(&config);
    let room = || ObstacleSet::walled_room(ROOM_HALF_SIZE, WALL_HEIGHT);

    let mut player: Client = SimulationLoop::new(
        config.clone(),
        broker.client(),
        HeadlessScene::new(),
        room(),
        Vec3::ZERO,
    );
    let mut peer: Client = SimulationLoop::new(
        peer_config(&config),
        broker.client(),
        HeadlessScene::new(),
        room(),
        Vec3::new(4.0, 0.0, 4.0),
    );

    player.start();
    peer.start();

    let frames = args.frames;
    let peer_leaves_at = frames * 3 / 4;
    let mut clock = FrameClock::new(config.movement.max_frame_time);

    for frame in 0..frames {
        std::thread::sleep(FRAME);
        let dt = clock.tick();
        let now = clock.last_frame_at();

        drive_player(&mut player, frame);
        if frame == peer_leaves_at {
            info!("Scripted peer leaving");
            peer.shutdown();
        } else {
            drive_peer(&mut peer, frame);
        }

        let report = player.tick(dt, now);
        peer.tick(dt, now);

        if report.spawned + report.despawned > 0 {
            info!(
                "Frame {frame}: {} avatar(s) in scene ({:?})",
                player.scene().len(),
                player.scene().ids()
            );
        }
        if let LinkStatus::Failed(reason) = player.status() {
            error!("Giving up: {reason}");
            break;
        }
    }

    if let Some(local) = player.local() {
        info!(
            "{} finished at ({:.2}, {:.2}) facing {:.2} rad",
            local.display_name, local.position.x, local.position.z, local.facing_angle
        );
    }
    for line in player.chat().lines() {
        info!("chat history | {}: {}", line.nickname, line.content);
    }

    peer.shutdown();
    player.shutdown();
    info!("{} frame(s) published by all clients", broker.published().len());
    ExitCode::SUCCESS
}

/// Broker with the server-side routing the real backend performs.
fn demo_broker(config: &Config) -> LoopbackBroker {
    let net = &config.network;
    let broker = LoopbackBroker::new();
    let room_topic = net.room_topic();
    broker.route(&net.join_destination, &room_topic);
    broker.route(&net.update_destination, &room_topic);
    broker.route(&net.leave_destination, &room_topic);
    broker.route(&net.chat_destination, &net.chat_topic);
    broker
}

fn peer_config(config: &Config) -> Config {
    let mut peer = config.clone();
    peer.player.nickname = if config.player.nickname == "Snowy" {
        "Snowy-2".to_string()
    } else {
        "Snowy".to_string()
    };
    peer.player.role = "BARISTA".to_string();
    peer
}

fn hold(client: &mut Client, key: Option<KeyCode>) {
    let keyboard = client.keyboard_mut();
    keyboard.release_all();
    if let Some(key) = key {
        keyboard.set_held(key, true);
    }
}

/// Walk forward, then right, then stand still.
fn drive_player(client: &mut Client, frame: u32) {
    let key = match frame {
        0..120 => Some(KeyCode::KeyW),
        120..240 => Some(KeyCode::KeyD),
        _ => None,
    };
    hold(client, key);
    if frame == 260 {
        client.send_chat("anyone on shift?");
    }
}

/// Pace a square around the counter and say hello once.
fn drive_peer(client: &mut Client, frame: u32) {
    let key = match (frame / 90) % 4 {
        0 => KeyCode::KeyS,
        1 => KeyCode::KeyA,
        2 => KeyCode::KeyW,
        _ => KeyCode::KeyD,
    };
    hold(client, Some(key));
    if frame == 60 {
        client.send_chat("hello from the counter");
    }
}
