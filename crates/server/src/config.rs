//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuration values that cannot work together.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick_rate must be greater than zero")]
    ZeroTickRate,
    #[error("outbound_queue must hold at least one frame")]
    ZeroOutboundQueue,
    #[error("player min_y ({min}) is greater than max_y ({max})")]
    PlayerBounds { min: f32, max: f32 },
    #[error("obstacle gap_min_y ({min}) is greater than gap_max_y ({max})")]
    GapRange { min: f32, max: f32 },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub obstacle: ObstacleConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.server.outbound_queue == 0 {
            return Err(ConfigError::ZeroOutboundQueue);
        }
        if self.player.min_y > self.player.max_y {
            return Err(ConfigError::PlayerBounds {
                min: self.player.min_y,
                max: self.player.max_y,
            });
        }
        if self.obstacle.gap_min_y > self.obstacle.gap_max_y {
            return Err(ConfigError::GapRange {
                min: self.obstacle.gap_min_y,
                max: self.obstacle.gap_max_y,
            });
        }
        for (name, value) in [
            ("player.size", self.player.size),
            ("obstacle.width", self.obstacle.width),
            ("obstacle.speed", self.obstacle.speed),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

/// Server networking and tick settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum simultaneous sessions.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Frames buffered per session before broadcasts to it are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Consecutive dropped frames before a session is evicted.
    #[serde(default = "default_max_lagged_ticks")]
    pub max_lagged_ticks: u32,
    /// Socket write timeout in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Simulated seconds per tick.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
            tick_rate: default_tick_rate(),
            outbound_queue: default_outbound_queue(),
            max_lagged_ticks: default_max_lagged_ticks(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5001
}
fn default_max_connections() -> usize {
    100
}
fn default_tick_rate() -> u32 {
    60
}
fn default_outbound_queue() -> usize {
    64
}
fn default_max_lagged_ticks() -> u32 {
    180
}
fn default_write_timeout_ms() -> u64 {
    5000
}

/// World dimensions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_width")]
    pub width: f32,
    #[serde(default = "default_world_height")]
    pub height: f32,
    /// Top edge of the floor box.
    #[serde(default = "default_floor_y")]
    pub floor_y: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_width(),
            height: default_world_height(),
            floor_y: default_floor_y(),
        }
    }
}

fn default_world_width() -> f32 {
    800.0
}
fn default_world_height() -> f32 {
    480.0
}
fn default_floor_y() -> f32 {
    350.0
}

/// Player physics. Distances are per tick, y grows downward.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_spawn_x")]
    pub spawn_x: f32,
    #[serde(default = "default_spawn_y")]
    pub spawn_y: f32,
    /// Edge length of the square bounding box.
    #[serde(default = "default_player_size")]
    pub size: f32,
    #[serde(default = "default_min_y")]
    pub min_y: f32,
    #[serde(default = "default_max_y")]
    pub max_y: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_lift")]
    pub lift: f32,
    /// Seconds of immunity after a collision reset.
    #[serde(default = "default_collision_cooldown")]
    pub collision_cooldown: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_x: default_spawn_x(),
            spawn_y: default_spawn_y(),
            size: default_player_size(),
            min_y: default_min_y(),
            max_y: default_max_y(),
            gravity: default_gravity(),
            lift: default_lift(),
            collision_cooldown: default_collision_cooldown(),
        }
    }
}

fn default_spawn_x() -> f32 {
    100.0
}
fn default_spawn_y() -> f32 {
    300.0
}
fn default_player_size() -> f32 {
    50.0
}
fn default_min_y() -> f32 {
    200.0
}
fn default_max_y() -> f32 {
    300.0
}
fn default_gravity() -> f32 {
    5.0
}
fn default_lift() -> f32 {
    10.0
}
fn default_collision_cooldown() -> f32 {
    3.0
}

/// Obstacle movement and spawning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleConfig {
    /// Leftward movement per tick.
    #[serde(default = "default_obstacle_speed")]
    pub speed: f32,
    #[serde(default = "default_obstacle_width")]
    pub width: f32,
    /// x of newly spawned obstacles.
    #[serde(default = "default_obstacle_spawn_x")]
    pub spawn_x: f32,
    /// Obstacles left of this x are removed.
    #[serde(default = "default_despawn_x")]
    pub despawn_x: f32,
    /// A new obstacle spawns once the newest one is left of this x.
    #[serde(default = "default_spawn_trigger_x")]
    pub spawn_trigger_x: f32,
    #[serde(default = "default_gap_height")]
    pub gap_height: f32,
    #[serde(default = "default_gap_min_y")]
    pub gap_min_y: f32,
    #[serde(default = "default_gap_max_y")]
    pub gap_max_y: f32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            speed: default_obstacle_speed(),
            width: default_obstacle_width(),
            spawn_x: default_obstacle_spawn_x(),
            despawn_x: default_despawn_x(),
            spawn_trigger_x: default_spawn_trigger_x(),
            gap_height: default_gap_height(),
            gap_min_y: default_gap_min_y(),
            gap_max_y: default_gap_max_y(),
        }
    }
}

fn default_obstacle_speed() -> f32 {
    5.0
}
fn default_obstacle_width() -> f32 {
    50.0
}
fn default_obstacle_spawn_x() -> f32 {
    800.0
}
fn default_despawn_x() -> f32 {
    -50.0
}
fn default_spawn_trigger_x() -> f32 {
    400.0
}
fn default_gap_height() -> f32 {
    150.0
}
fn default_gap_min_y() -> f32 {
    225.0
}
fn default_gap_max_y() -> f32 {
    325.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.server.port, 5001);
        assert!((config.server.tick_seconds() - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 6000

            [obstacle]
            gap_height = 200.0
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.tick_rate, 60);
        assert_eq!(config.obstacle.gap_height, 200.0);
        assert_eq!(config.obstacle.speed, 5.0);
        assert_eq!(config.player.collision_cooldown, 3.0);
    }

    #[test]
    fn test_default_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.world.floor_y, 350.0);
        assert_eq!(config.server.bind, "0.0.0.0");
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        let mut config = Config::default();
        config.obstacle.gap_min_y = 400.0;
        assert!(matches!(config.validate(), Err(ConfigError::GapRange { .. })));

        let mut config = Config::default();
        config.server.tick_rate = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickRate));

        let mut config = Config::default();
        config.player.size = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "player.size", .. })
        ));
    }
}
