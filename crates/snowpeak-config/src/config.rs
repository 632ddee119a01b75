//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Broker endpoint, room and topic layout.
    pub network: NetworkConfig,
    /// Local player identity.
    pub player: PlayerConfig,
    /// Local movement tuning.
    pub movement: MovementConfig,
    /// Remote interpolation tuning.
    pub remote: RemoteConfig,
    /// Outbound state publication gates.
    pub publisher: PublisherConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Broker endpoint and destination layout.
///
/// Topics are subscribed to; destinations are published to. The room topic
/// and the private sync topic are formed by appending the room id and the
/// player id to their prefixes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Broker endpoint URL.
    pub endpoint: String,
    /// Room joined at session start.
    pub room_id: String,
    /// Prefix of the room broadcast topic.
    pub room_topic_prefix: String,
    /// Prefix of the private per-player sync topic.
    pub sync_topic_prefix: String,
    /// Room chat topic.
    pub chat_topic: String,
    /// Destination for the join announcement.
    pub join_destination: String,
    /// Destination for position updates.
    pub update_destination: String,
    /// Destination for the leave announcement.
    pub leave_destination: String,
    /// Destination for chat lines.
    pub chat_destination: String,
}

/// Local player identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Display name; doubles as the player id within a room.
    pub nickname: String,
    /// Role name as sent on the wire (`HALL_SERVER` or `BARISTA`).
    pub role: String,
}

/// Local movement tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovementConfig {
    /// Walk speed in units per second.
    pub speed: f32,
    /// Minimum ray-hit distance below which forward movement is refused.
    pub clearance: f32,
    /// Height above the ground the collision ray is cast from.
    pub body_offset: f32,
    /// Fraction of the remaining turn applied per tick (0.0 - 1.0).
    pub turn_lerp: f32,
    /// Upper bound for a single frame's delta time, in seconds.
    pub max_frame_time: f32,
}

/// Remote entity interpolation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Exponential smoothing rate `k` in `1 - exp(-k * dt)`.
    pub smoothing: f32,
    /// Squared distance to target above which a remote counts as moving.
    pub moving_epsilon_sq: f32,
}

/// Outbound publication gates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublisherConfig {
    /// Minimum time between two sends, in milliseconds.
    pub min_interval_ms: u64,
    /// Minimum squared displacement since the last send.
    pub min_distance_sq: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8080/ws-snowpeak".to_string(),
            room_id: "1".to_string(),
            room_topic_prefix: "/topic/room.".to_string(),
            sync_topic_prefix: "/topic/sync.".to_string(),
            chat_topic: "/topic/chat".to_string(),
            join_destination: "/app/join".to_string(),
            update_destination: "/app/update".to_string(),
            leave_destination: "/app/leave".to_string(),
            chat_destination: "/app/chat".to_string(),
        }
    }
}

impl NetworkConfig {
    /// Broadcast topic of the configured room.
    pub fn room_topic(&self) -> String {
        format!("{}{}", self.room_topic_prefix, self.room_id)
    }

    /// Private sync topic for `player_id`.
    pub fn sync_topic(&self, player_id: &str) -> String {
        format!("{}{}", self.sync_topic_prefix, player_id)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            nickname: "Player".to_string(),
            role: "HALL_SERVER".to_string(),
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 20.0,
            clearance: 0.6,
            body_offset: 0.5,
            turn_lerp: 0.1,
            max_frame_time: 0.1,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            smoothing: 12.0,
            moving_epsilon_sq: 1e-4,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 100,
            min_distance_sq: 0.0025,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Reject values that parse but would break the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player.nickname.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "player.nickname",
                reason: "must not be blank".to_string(),
            });
        }
        if !matches!(self.player.role.as_str(), "HALL_SERVER" | "BARISTA") {
            return Err(ConfigError::InvalidValue {
                field: "player.role",
                reason: format!("unknown role {:?}", self.player.role),
            });
        }
        if !(self.movement.speed > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "movement.speed",
                reason: format!("must be positive, got {}", self.movement.speed),
            });
        }
        if !(self.movement.turn_lerp > 0.0 && self.movement.turn_lerp <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "movement.turn_lerp",
                reason: format!("must be in (0, 1], got {}", self.movement.turn_lerp),
            });
        }
        if !(self.movement.max_frame_time > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "movement.max_frame_time",
                reason: format!("must be positive, got {}", self.movement.max_frame_time),
            });
        }
        if !(self.remote.smoothing > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "remote.smoothing",
                reason: format!("must be positive, got {}", self.remote.smoothing),
            });
        }
        Ok(())
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(2))
                .unwrap();
        assert!(ron_str.contains("min_interval_ms: 100"));
        assert!(ron_str.contains("room_id: \"1\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.player.nickname = "mina".to_string();
        config.movement.speed = 22.0;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(network: (), player: (nickname: \"kim\"))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.player.nickname, "kim");
        assert_eq!(config.player.role, "HALL_SERVER");
        assert_eq!(config.remote, RemoteConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_topic_helpers() {
        let network = NetworkConfig::default();
        assert_eq!(network.room_topic(), "/topic/room.1");
        assert_eq!(network.sync_topic("mina"), "/topic/sync.mina");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.network.endpoint = "ws://10.0.0.1:8080/ws-snowpeak".to_string();
        config.publisher.min_interval_ms = 80;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_role() {
        let mut config = Config::default();
        config.player.role = "CHEF".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "player.role",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_zero_speed() {
        let mut config = Config::default();
        config.movement.speed = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ron"),
            "(player: (nickname: \"  \"))",
        )
        .unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
