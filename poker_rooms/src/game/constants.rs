//! Table-wide constants.

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Hole cards dealt to each seat.
pub const HOLE_CARDS: usize = 2;

/// Cards on a complete board.
pub const COMMUNITY_CARDS: usize = 5;

/// Cards that make up a scored hand.
pub const HAND_SIZE: usize = 5;

/// Most seats a single deck can deal to (2 * 23 + 5 = 51).
pub const MAX_SEATS: usize = (DECK_SIZE - COMMUNITY_CARDS) / HOLE_CARDS;

/// Highest card value. Aces play low only inside a wheel straight.
pub const ACE: u8 = 14;
