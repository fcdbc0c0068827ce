use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self},
    str::FromStr,
};
use thiserror::Error;

use super::constants::{ACE, COMMUNITY_CARDS, HOLE_CARDS};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

pub const SUITS: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];

impl Suit {
    fn letter(self) -> char {
        match self {
            Self::Club => 'C',
            Self::Spade => 'S',
            Self::Diamond => 'D',
            Self::Heart => 'H',
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// A card is a tuple of a value (deuce=2u8 ... ace=14u8) and a suit.
///
/// Cards travel as two-letter codes such as `"AS"` or `"TH"`, which is
/// also what [`Card::from_str`] accepts (`X` is read as a ten too).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct Card(pub Value, pub Suit);

impl Card {
    /// Two-letter code, e.g. `"QD"`.
    pub fn code(&self) -> String {
        let value = match self.0 {
            14 => 'A',
            13 => 'K',
            12 => 'Q',
            11 => 'J',
            10 => 'T',
            v => char::from(b'0' + v),
        };
        format!("{value}{}", self.1.letter())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            13 => "K",
            12 => "Q",
            11 => "J",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseCardError {
    #[error("card code {0:?} must be a value letter followed by a suit letter")]
    Malformed(String),
    #[error("unknown card value {0:?}")]
    Value(char),
    #[error("unknown suit {0:?}")]
    Suit(char),
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(value), Some(suit), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ParseCardError::Malformed(s.to_string()));
        };
        let value = match value.to_ascii_uppercase() {
            'A' => ACE,
            'K' => 13,
            'Q' => 12,
            'J' => 11,
            'T' | 'X' => 10,
            c @ '2'..='9' => c as u8 - b'0',
            c => return Err(ParseCardError::Value(c)),
        };
        let suit = match suit.to_ascii_uppercase() {
            'C' => Suit::Club,
            'S' => Suit::Spade,
            'D' => Suit::Diamond,
            'H' => Suit::Heart,
            c => return Err(ParseCardError::Suit(c)),
        };
        Ok(Self(value, suit))
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.code()
    }
}

impl TryFrom<String> for Card {
    type Error = ParseCardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parse a run of concatenated card codes, e.g. `"AHAS"`.
pub fn parse_cards(codes: &str) -> Result<Vec<Card>, ParseCardError> {
    let chars: Vec<char> = codes.chars().collect();
    if chars.len() % 2 != 0 {
        return Err(ParseCardError::Malformed(codes.to_string()));
    }
    chars
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>().parse())
        .collect()
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
        };
        write!(f, "{repr}")
    }
}

/// Betting rounds of a hand. The stage decides how much of the board is
/// face up.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    PreFlop,
    Flop,
    Turn,
    River,
}

impl Stage {
    pub fn revealed_cards(self) -> usize {
        match self {
            Self::PreFlop => 0,
            Self::Flop => 3,
            Self::Turn => 4,
            Self::River => COMMUNITY_CARDS,
        }
    }

    /// The following round, or `None` once the river has been bet.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::PreFlop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            Self::River => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
        };
        write!(f, "{repr}")
    }
}

/// A deck cut down to exactly what one hand needs: two hole cards per
/// seat followed by the five community cards.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// All 52 cards in a fixed order.
    pub fn standard() -> Vec<Card> {
        (2..=ACE)
            .flat_map(|value| SUITS.into_iter().map(move |suit| Card(value, suit)))
            .collect()
    }

    /// Shuffle a full deck and keep the `2 * num_seats + 5` cards on top.
    pub fn shuffled<R: Rng>(num_seats: usize, rng: &mut R) -> Self {
        let mut cards = Self::standard();
        cards.shuffle(rng);
        cards.truncate(HOLE_CARDS * num_seats + COMMUNITY_CARDS);
        Self { cards }
    }

    /// Stack the deck with the given cards, in order.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Hole cards of the seat at `seat`.
    pub fn hole_cards(&self, seat: usize) -> &[Card] {
        let start = seat * HOLE_CARDS;
        self.cards.get(start..start + HOLE_CARDS).unwrap_or_default()
    }

    /// The face-up part of the board for `num_seats` seats at `stage`.
    pub fn community_cards(&self, num_seats: usize, stage: Stage) -> &[Card] {
        let start = num_seats * HOLE_CARDS;
        self.cards
            .get(start..start + stage.revealed_cards())
            .unwrap_or_default()
    }
}

/// Type alias for whole dollars. All bets and player stacks are represented
/// as whole dollars (there's no point arguing over pennies).
pub type Usd = u32;

/// Opaque identifier of a connected client.
pub type SessionId = String;

/// A registered player's name and stack.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Account {
    pub name: String,
    pub balance: Usd,
}

impl Account {
    pub fn new(name: &str, balance: Usd) -> Self {
        Self {
            name: name.to_string(),
            balance,
        }
    }
}

/// Registered players keyed by session.
pub type Accounts = BTreeMap<SessionId, Account>;

/// How much of the pot a seat can still win.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Active(Usd),
    Folded,
}

impl Eligibility {
    pub fn claim(&self) -> Option<Usd> {
        match self {
            Self::Active(claim) => Some(*claim),
            Self::Folded => None,
        }
    }

    pub fn is_folded(&self) -> bool {
        matches!(self, Self::Folded)
    }
}

/// A seat in the current hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerInHand {
    pub session_id: SessionId,
    /// Chips committed during the current betting round.
    pub bet: Usd,
    pub eligibility: Eligibility,
    /// Whether the seat may still act this round even though its bet
    /// already matches the high bet.
    pub has_option: bool,
}

impl PlayerInHand {
    pub fn new(session_id: SessionId, claim: Usd) -> Self {
        Self {
            session_id,
            bet: 0,
            eligibility: Eligibility::Active(claim),
            has_option: true,
        }
    }
}

/// What a player got out of a finished hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerAfterGame {
    /// Hole cards, shown only when the pot was contested at showdown.
    pub hand: Option<Vec<Card>>,
    pub payout: Usd,
}

/// Record of a finished hand, keyed by winning session.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CompletedGame {
    pub community_cards: Vec<Card>,
    pub players: BTreeMap<SessionId, PlayerAfterGame>,
}
