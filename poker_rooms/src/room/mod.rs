//! Poker rooms.
//!
//! A [`Room`] is a set of registered players plus the game they're
//! playing. Every room operation is a pure transition from one room value
//! to the next; [`RoomManager`] runs those transitions against the
//! versioned store so concurrent requests never lose an update.

pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod view;

pub use config::RoomConfig;
pub use errors::{RoomError, RoomResult};
pub use manager::RoomManager;
pub use models::Room;
pub use view::{GameView, HandHistoryView, PlayerView, SeatView};
