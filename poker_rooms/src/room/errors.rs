//! Room error types.

use thiserror::Error;

use crate::{db::StoreError, game::GameError};

/// Room errors
#[derive(Debug, Error)]
pub enum RoomError {
    /// Another session already uses the name
    #[error("the name {0:?} is taken")]
    NameTaken(String),

    #[error("names can be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("names must be letters, digits, spaces, or - _ . ' and not start or end with a space")]
    InvalidCharacters,

    #[error("the room is full ({max} players)")]
    RoomFull { max: usize },

    #[error("only the room admin can do that")]
    NotAdmin,

    #[error("a game is already in progress")]
    AlreadyStarted,

    #[error("need at least 2 players with chips")]
    NotEnoughPlayers,

    #[error("join the room first")]
    NotJoined,

    #[error("no room named {0:?}")]
    RoomNotFound(String),

    #[error("no player named {0:?}")]
    UnknownPlayer(String),

    /// The adjustment would leave a negative or oversized balance
    #[error("can't adjust a balance by {0}")]
    InvalidAmount(i64),

    #[error("the room can't hold any more chips")]
    ChipLimit,

    #[error("no game in progress")]
    NoGameInProgress,

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RoomError {
    /// Get a client-safe error message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            RoomError::Store(e) => e.client_message().to_string(),
            RoomError::Game(e) if e.is_internal() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;
