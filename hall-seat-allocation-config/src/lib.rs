use core::fmt::{Debug, Display};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// Inclusive range of room numbers on a floor.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoomRange {
    pub first: u16,
    pub last: u16,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloorRooms {
    pub floor: u8,
    pub first: u16,
    pub last: u16,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Floors are numbered `1..=floors`.
    pub floors: u8,
    pub seats_per_room: u8,
    /// Room range used by every floor without an override.
    pub rooms: RoomRange,
    pub floor_rooms: Vec<FloorRooms>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            floors: 5,
            seats_per_room: 4,
            rooms: RoomRange { first: 1, last: 20 },
            floor_rooms: Vec::new(),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff_ms: 50,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    /// In-memory storage is used when this is not set.
    pub database_url: Option<String>,
    pub database_pool_size: usize,
    pub layout: LayoutConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 3000)),
            database_url: None,
            database_pool_size: 16,
            layout: LayoutConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(Figment::new()
        .merge(Toml::file("hall.toml"))
        .merge(Env::prefixed("HALL_").split("__"))
        .extract()?)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn empty_environment_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = get_config().map_err(|err| err.to_string())?;
            assert_eq!(config, Config::default());
            assert_eq!(config.layout.floors, 5);
            assert_eq!(config.layout.seats_per_room, 4);
            assert!(config.database_url.is_none());
            Ok(())
        });
    }

    #[test]
    fn file_and_environment_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hall.toml",
                r#"
                listen = "0.0.0.0:8080"

                [layout]
                floors = 3

                [[layout.floor_rooms]]
                floor = 1
                first = 101
                last = 112
                "#,
            )?;
            jail.set_env("HALL_DATABASE_URL", "postgres://localhost/hall");
            jail.set_env("HALL_RETRY__ATTEMPTS", "7");

            let config = get_config().map_err(|err| err.to_string())?;
            assert_eq!(config.listen.port(), 8080);
            assert_eq!(config.layout.floors, 3);
            assert_eq!(config.layout.seats_per_room, 4);
            assert_eq!(
                config.layout.floor_rooms,
                vec![FloorRooms {
                    floor: 1,
                    first: 101,
                    last: 112
                }]
            );
            assert_eq!(
                config.database_url.as_deref(),
                Some("postgres://localhost/hall")
            );
            assert_eq!(config.retry.attempts, 7);
            assert_eq!(config.retry.initial_backoff_ms, 50);
            Ok(())
        });
    }

    #[test]
    fn malformed_values_are_reported() {
        Jail::expect_with(|jail| {
            jail.set_env("HALL_LISTEN", "not an address");
            assert!(get_config().is_err());
            Ok(())
        });
    }
}
