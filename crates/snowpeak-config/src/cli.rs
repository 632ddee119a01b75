//! Command-line argument parsing for the Snowpeak client.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Snowpeak client command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "snowpeak", about = "Snowpeak multiplayer avatar client")]
pub struct CliArgs {
    /// Display name used as the player id.
    #[arg(long)]
    pub nickname: Option<String>,

    /// Player role (HALL_SERVER or BARISTA).
    #[arg(long)]
    pub role: Option<String>,

    /// Broker endpoint URL.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Room to join.
    #[arg(long)]
    pub room: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate before shutting down.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref nickname) = args.nickname {
            self.player.nickname = nickname.clone();
        }
        if let Some(ref role) = args.role {
            self.player.role = role.to_uppercase();
        }
        if let Some(ref endpoint) = args.endpoint {
            self.network.endpoint = endpoint.clone();
        }
        if let Some(ref room) = args.room {
            self.network.room_id = room.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            nickname: None,
            role: None,
            endpoint: None,
            room: None,
            log_level: None,
            config: None,
            frames: 600,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            nickname: Some("mina".to_string()),
            role: Some("barista".to_string()),
            room: Some("7".to_string()),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.player.nickname, "mina");
        assert_eq!(config.player.role, "BARISTA");
        assert_eq!(config.network.room_id, "7");
        // Non-overridden fields retain defaults
        assert_eq!(config.network.endpoint, "ws://localhost:8080/ws-snowpeak");
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["snowpeak", "--nickname", "jun", "--frames", "30"]);
        assert_eq!(args.nickname.as_deref(), Some("jun"));
        assert_eq!(args.frames, 30);
        assert!(args.endpoint.is_none());
    }
}
