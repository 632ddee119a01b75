//! Rate- and distance-gated outbound state.
//!
//! The local controller runs every frame, but peers only need a fresh state
//! when the avatar actually went somewhere. [`StatePublisher::poll`] emits a
//! [`PlayerState`] only when both gates pass:
//!
//! 1. **time**: at least `min_interval` since the last send;
//! 2. **distance**: moved more than `sqrt(min_distance_sq)` since the last
//!    sent position, or stopped since the last send.
//!
//! The stop is latched: if the time gate rejects the exact tick the avatar
//! stops, the rest position still goes out on the next tick that passes it.

use std::time::{Duration, Instant};

use glam::Vec3;
use snowpeak_config::PublisherConfig;
use snowpeak_net::PlayerState;
use snowpeak_player::Entity;

#[derive(Debug, Clone)]
pub struct StatePublisher {
    /// Minimum time between two sends.
    pub min_interval: Duration,
    /// Squared displacement a move must exceed to be worth sending.
    pub min_distance_sq: f32,
    last_sent_at: Option<Instant>,
    last_sent_position: Option<Vec3>,
    was_moving: bool,
    stop_pending: bool,
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::from(&PublisherConfig::default())
    }
}

impl From<&PublisherConfig> for StatePublisher {
    fn from(config: &PublisherConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_interval_ms),
            config.min_distance_sq,
        )
    }
}

impl StatePublisher {
    pub fn new(min_interval: Duration, min_distance_sq: f32) -> Self {
        Self {
            min_interval,
            min_distance_sq,
            last_sent_at: None,
            last_sent_position: None,
            was_moving: false,
            stop_pending: false,
        }
    }

    /// Offer this tick's state. Returns the payload to send, if any.
    ///
    /// `moving` is the local controller's result for this tick.
    pub fn poll(
        &mut self,
        entity: &Entity,
        moving: bool,
        room_id: &str,
        now: Instant,
    ) -> Option<PlayerState> {
        if self.was_moving && !moving {
            self.stop_pending = true;
        }
        self.was_moving = moving;

        let time_ok = self
            .last_sent_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.min_interval);
        if !time_ok {
            return None;
        }

        let distance_ok = match self.last_sent_position {
            None => true,
            Some(last) => {
                last.distance_squared(entity.position) > self.min_distance_sq || self.stop_pending
            }
        };
        if !distance_ok {
            return None;
        }

        self.last_sent_at = Some(now);
        self.last_sent_position = Some(entity.position);
        self.stop_pending = false;
        Some(entity.to_state(room_id))
    }

    /// Forget both baselines. The next poll passes the distance gate.
    pub fn reset(&mut self) {
        self.last_sent_at = None;
        self.last_sent_position = None;
        self.was_moving = false;
        self.stop_pending = false;
    }

    pub fn last_sent_position(&self) -> Option<Vec3> {
        self.last_sent_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowpeak_net::{FixedPosition, PlayerRole};

    fn player_at(x: f32, z: f32) -> Entity {
        Entity::local("mina", PlayerRole::HallServer, Vec3::new(x, 0.0, z))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_poll_sends() {
        let mut p = StatePublisher::default();
        let sent = p.poll(&player_at(1.0, 2.0), false, "1", Instant::now()).unwrap();
        assert_eq!(sent.player_id, "mina");
        assert_eq!(sent.position, Some(FixedPosition { x: 100, y: 200 }));
        assert_eq!(sent.room_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_two_polls_30ms_apart_send_once() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        let mut sends = 0;
        if p.poll(&player_at(0.0, 0.0), true, "1", t0).is_some() {
            sends += 1;
        }
        if p.poll(&player_at(0.01, 0.0), true, "1", t0 + ms(30)).is_some() {
            sends += 1;
        }
        assert_eq!(sends, 1);
    }

    #[test]
    fn test_time_gate_blocks_large_moves() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        p.poll(&player_at(0.0, 0.0), true, "1", t0);
        assert!(p.poll(&player_at(5.0, 0.0), true, "1", t0 + ms(50)).is_none());
        assert!(p.poll(&player_at(5.0, 0.0), true, "1", t0 + ms(100)).is_some());
    }

    #[test]
    fn test_distance_gate_blocks_tiny_moves() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        p.poll(&player_at(0.0, 0.0), true, "1", t0);
        // 0.04^2 = 0.0016, under the 0.0025 threshold.
        assert!(p.poll(&player_at(0.04, 0.0), true, "1", t0 + ms(200)).is_none());
        assert!(p.poll(&player_at(0.06, 0.0), true, "1", t0 + ms(400)).is_some());
    }

    #[test]
    fn test_stop_sends_rest_position() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        p.poll(&player_at(0.0, 0.0), true, "1", t0);
        // Tiny final step, then stop: distance alone would not send it.
        let rest = player_at(0.01, 0.0);
        let sent = p.poll(&rest, false, "1", t0 + ms(150));
        assert!(sent.is_some());
        assert_eq!(p.last_sent_position(), Some(rest.position));
    }

    #[test]
    fn test_stop_is_latched_through_time_gate() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        p.poll(&player_at(0.0, 0.0), true, "1", t0);
        assert!(p.poll(&player_at(0.01, 0.0), false, "1", t0 + ms(20)).is_none());
        assert!(p.poll(&player_at(0.01, 0.0), false, "1", t0 + ms(40)).is_none());
        assert!(p.poll(&player_at(0.01, 0.0), false, "1", t0 + ms(120)).is_some());
        // Latch consumed.
        assert!(p.poll(&player_at(0.01, 0.0), false, "1", t0 + ms(300)).is_none());
    }

    #[test]
    fn test_idle_player_sends_nothing_after_first() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        let e = player_at(3.0, 3.0);
        assert!(p.poll(&e, false, "1", t0).is_some());
        for n in 1..20 {
            assert!(p.poll(&e, false, "1", t0 + ms(n * 100)).is_none());
        }
    }

    #[test]
    fn test_reset_restores_first_send() {
        let mut p = StatePublisher::default();
        let t0 = Instant::now();
        let e = player_at(0.0, 0.0);
        p.poll(&e, false, "1", t0);
        p.reset();
        assert!(p.poll(&e, false, "1", t0 + ms(1)).is_some());
    }
}
