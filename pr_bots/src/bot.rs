//! A bot that plays one seat by watching its view of the room.

use log::{debug, info, warn};
use poker_rooms::{
    RoomError, RoomManager,
    entities::Usd,
    game::GameError,
    room::view::GameView,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const FOLD_FREQUENCY: f64 = 0.1;
const RAISE_FREQUENCY: f64 = 0.15;

/// What the bot decided to do on its turn.
#[derive(Debug, PartialEq)]
enum Action {
    Fold,
    Bet(Usd),
}

pub struct Bot {
    pub session_id: String,
    pub room: String,
    /// Starts and resumes the game.
    pub is_admin: bool,
    /// Stop once this many hands are in the room's history.
    pub max_hands: usize,
    rng: StdRng,
}

impl Bot {
    pub fn new(session_id: String, room: String, is_admin: bool, max_hands: usize, seed: u64) -> Self {
        Self {
            session_id,
            room,
            is_admin,
            max_hands,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Mostly call, sometimes raise, rarely fold. Never folds a free check.
    fn choose(&mut self, game: &GameView, small_blind: Usd) -> Action {
        let high = game.players.iter().map(|seat| seat.bet).max().unwrap_or(0);
        if high > 0 && self.rng.random_bool(FOLD_FREQUENCY) {
            return Action::Fold;
        }
        if self.rng.random_bool(RAISE_FREQUENCY) {
            let raise = small_blind.saturating_mul(2 * self.rng.random_range(1..=4));
            return Action::Bet(high.saturating_add(raise));
        }
        Action::Bet(high)
    }

    /// Play until the game ends or enough hands have been played.
    pub async fn run(mut self, rooms: RoomManager) -> anyhow::Result<()> {
        let mut since = 0;

        loop {
            let (version, view) = rooms
                .wait_player_view(&self.room, &self.session_id, since, None)
                .await?;
            since = version;
            let Some(view) = view else {
                info!("{} left: the room is gone", self.session_id);
                return Ok(());
            };
            // Bots join a game already under way, so no hand means the game
            // is over or the bot is out of chips.
            let game = match view.game.as_ref() {
                Some(game) if view.history.len() < self.max_hands => game,
                _ => {
                    info!("{} done after {} hands", self.session_id, view.history.len());
                    return Ok(());
                }
            };

            if game.next_to_act_name.is_none() && self.is_admin {
                info!("nobody can act, resuming the game");
                self.act(&rooms, None).await?;
                continue;
            }
            if game.should_act_now {
                let action = self.choose(game, view.small_blind);
                self.act(&rooms, Some(action)).await?;
            }
        }
    }

    async fn act(&self, rooms: &RoomManager, action: Option<Action>) -> anyhow::Result<()> {
        debug!("{} plays {action:?}", self.session_id);
        let result = match action {
            None => rooms.start(&self.room, &self.session_id).await,
            Some(Action::Fold) => rooms.fold(&self.room, &self.session_id).await,
            Some(Action::Bet(amount)) => rooms.bet(&self.room, &self.session_id, amount).await,
        };
        match result {
            Ok(_) => Ok(()),
            // The view was stale; the next wake-up brings a fresh one.
            Err(RoomError::Game(GameError::OutOfTurnAction)) | Err(RoomError::AlreadyStarted) => {
                Ok(())
            }
            Err(err @ RoomError::Store(_)) => Err(err.into()),
            Err(err) => {
                warn!("{} was refused: {}", self.session_id, err.client_message());
                Ok(())
            }
        }
    }
}
