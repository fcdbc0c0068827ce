//! Room configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    config::{ConfigError, parse_env_or},
    game::{constants::MAX_SEATS, entities::Usd},
};

/// Limits and defaults applied to every room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Most players that can register in one room
    pub max_players: usize,

    /// Longest accepted player name, in characters
    pub max_name_length: usize,

    /// Chips a new player starts with
    pub starting_balance: Usd,

    /// Small blind of a new room; the big blind is twice this
    pub small_blind: Usd,

    /// Completed hands between blind doublings, zero to never double
    pub blind_interval: u32,

    /// Upper bound on a single long-poll
    pub long_poll_timeout: Duration,

    /// Most hands one action may play out on its own when nobody is left
    /// able to act
    pub max_chained_hands: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 10,
            max_name_length: 64,
            starting_balance: 100,
            small_blind: 1,
            blind_interval: 0,
            long_poll_timeout: Duration::from_secs(60),
            max_chained_hands: 64,
        }
    }
}

impl RoomConfig {
    /// Load overrides from the environment:
    ///
    /// - `ROOM_MAX_PLAYERS` (default: 10)
    /// - `ROOM_MAX_NAME_LENGTH` (default: 64)
    /// - `ROOM_STARTING_BALANCE` (default: 100)
    /// - `ROOM_SMALL_BLIND` (default: 1)
    /// - `ROOM_BLIND_INTERVAL` (default: 0)
    /// - `ROOM_LONG_POLL_SECS` (default: 60)
    /// - `ROOM_MAX_CHAINED_HANDS` (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_players: parse_env_or("ROOM_MAX_PLAYERS", defaults.max_players)?,
            max_name_length: parse_env_or("ROOM_MAX_NAME_LENGTH", defaults.max_name_length)?,
            starting_balance: parse_env_or("ROOM_STARTING_BALANCE", defaults.starting_balance)?,
            small_blind: parse_env_or("ROOM_SMALL_BLIND", defaults.small_blind)?,
            blind_interval: parse_env_or("ROOM_BLIND_INTERVAL", defaults.blind_interval)?,
            long_poll_timeout: Duration::from_secs(parse_env_or(
                "ROOM_LONG_POLL_SECS",
                defaults.long_poll_timeout.as_secs(),
            )?),
            max_chained_hands: parse_env_or(
                "ROOM_MAX_CHAINED_HANDS",
                defaults.max_chained_hands,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_SEATS).contains(&self.max_players) {
            return Err(ConfigError::invalid(
                "ROOM_MAX_PLAYERS",
                format!("Must be between 2 and {MAX_SEATS} (one deck per hand)"),
            ));
        }
        if self.max_name_length == 0 {
            return Err(ConfigError::invalid("ROOM_MAX_NAME_LENGTH", "Must be greater than 0"));
        }
        if self.starting_balance == 0 {
            return Err(ConfigError::invalid("ROOM_STARTING_BALANCE", "Must be greater than 0"));
        }
        if self.small_blind == 0 {
            return Err(ConfigError::invalid("ROOM_SMALL_BLIND", "Must be greater than 0"));
        }
        if self.long_poll_timeout.is_zero() {
            return Err(ConfigError::invalid("ROOM_LONG_POLL_SECS", "Must be greater than 0"));
        }
        if self.max_chained_hands == 0 {
            return Err(ConfigError::invalid(
                "ROOM_MAX_CHAINED_HANDS",
                "Must be greater than 0",
            ));
        }
        Ok(())
    }
}
