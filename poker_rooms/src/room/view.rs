//! What one session is allowed to see of a room.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::models::Room;
use crate::game::entities::{Card, CompletedGame, Eligibility, PlayerAfterGame, Stage, Usd};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeatView {
    pub name: String,
    pub bet: Usd,
    pub eligibility: Eligibility,
    pub has_option: bool,
}

/// The current hand as seen from one seat. Other seats' hole cards stay
/// hidden.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameView {
    pub should_act_now: bool,
    pub next_to_act_name: Option<String>,
    pub pot: Usd,
    pub stage: Stage,
    pub my_hole_cards: Vec<Card>,
    pub community_cards: Vec<Card>,
    pub players: Vec<SeatView>,
}

/// A finished hand with players named rather than keyed by session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandHistoryView {
    pub community_cards: Vec<Card>,
    pub players: BTreeMap<String, PlayerAfterGame>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub my_name: Option<String>,
    pub admin_name: Option<String>,
    pub balances: BTreeMap<String, Usd>,
    pub small_blind: Usd,
    /// Absent between games and for sessions waiting on the next hand.
    pub game: Option<GameView>,
    /// Most recent hand first.
    pub history: Vec<HandHistoryView>,
}

impl Room {
    /// Display name for a session, falling back to the session id.
    fn display_name(&self, session_id: &str) -> String {
        self.name_of(session_id).unwrap_or(session_id).to_string()
    }

    fn game_view(&self, session_id: &str) -> Option<GameView> {
        let game = self.game.as_ref()?;
        let seat = game.seat_of(session_id)?;
        let next = game.next_to_act_idx(&self.players);

        Some(GameView {
            should_act_now: next == Some(seat),
            next_to_act_name: next.map(|idx| self.display_name(&game.players[idx].session_id)),
            pot: game.pot,
            stage: game.stage,
            my_hole_cards: game.hole_cards(seat).to_vec(),
            community_cards: game.community_cards().to_vec(),
            players: game
                .players
                .iter()
                .map(|p| SeatView {
                    name: self.display_name(&p.session_id),
                    bet: p.bet,
                    eligibility: p.eligibility,
                    has_option: p.has_option,
                })
                .collect(),
        })
    }

    fn history_view(&self, record: &CompletedGame) -> HandHistoryView {
        HandHistoryView {
            community_cards: record.community_cards.clone(),
            players: record
                .players
                .iter()
                .map(|(id, result)| (self.display_name(id), result.clone()))
                .collect(),
        }
    }

    /// Project the room for `session_id`, who may not have joined.
    pub fn player_view(&self, session_id: &str) -> PlayerView {
        PlayerView {
            my_name: self.name_of(session_id).map(str::to_string),
            admin_name: self.admin_name().map(str::to_string),
            balances: self
                .players
                .values()
                .map(|account| (account.name.clone(), account.balance))
                .collect(),
            small_blind: self.small_blind,
            game: self.game_view(session_id),
            history: self
                .log
                .iter()
                .rev()
                .map(|record| self.history_view(record))
                .collect(),
        }
    }
}
