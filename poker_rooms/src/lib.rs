//! # Poker Rooms
//!
//! Multi-room Texas Hold'em with no-limit betting, side pots, and state
//! kept in a compare-and-swap store.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, hand evaluation, and the betting state machine
//! - [`room`]: registration, dealing, and per-player views of a room
//! - [`db`]: the versioned store rooms live in, in memory or in PostgreSQL
//! - [`config`]: environment parsing shared by the config types
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use poker_rooms::{MemoryRepository, RoomConfig, RoomManager};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), poker_rooms::RoomError> {
//! let rooms = RoomManager::new(Arc::new(MemoryRepository::new()), RoomConfig::default());
//! rooms.register("lobby", "session-1", "alice").await?;
//! rooms.register("lobby", "session-2", "bob").await?;
//! rooms.start("lobby", "session-1").await?;
//!
//! let view = rooms.get_player_view("lobby", "session-1").await?;
//! assert!(view.and_then(|v| v.game).is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;

/// Versioned document storage.
pub mod db;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Advance, Game, GameError, GameResult,
    constants::{self, MAX_SEATS},
    entities::{self, Card, Deck, Rank, Stage, Suit, Usd},
    functional,
};

pub mod room;
pub use config::ConfigError;
pub use db::{MemoryRepository, PgRepository, VersionedRepository};
pub use room::{PlayerView, Room, RoomConfig, RoomError, RoomManager, RoomResult};
