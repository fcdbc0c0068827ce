//! Poker game engine.
//!
//! - [`entities`]: cards, decks, stages, and the per-seat bookkeeping
//! - [`functional`]: hand evaluation and winner selection
//! - [`state_machine`]: the betting state machine and pot payout

pub mod constants;
pub mod entities;
pub mod functional;
pub mod state_machine;

pub use state_machine::{Advance, Game, GameError, GameResult};
