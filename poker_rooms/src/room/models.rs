//! The persisted room and its transitions.
//!
//! Every transition takes the room by value and returns the next room or
//! an error. They never touch the store, so the store can rerun them
//! freely when a write loses a race.

use log::{info, warn};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::{
    config::RoomConfig,
    errors::{RoomError, RoomResult},
};
use crate::game::{
    Advance, Game,
    entities::{Account, Accounts, CompletedGame, Deck, SessionId, Usd},
};

/// Everything stored for one room.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Room {
    pub players: Accounts,
    /// The first session to register.
    pub admin: Option<SessionId>,
    /// Completed hands between blind doublings, zero for never.
    pub blind_interval: u32,
    pub small_blind: Usd,
    pub game: Option<Game>,
    /// Finished hands, oldest first.
    pub log: Vec<CompletedGame>,
    /// Chips left over when the last game ended, put back in play by the
    /// next one.
    #[serde(default)]
    pub carried_pot: Usd,
}

fn valid_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '\'')
}

impl Room {
    pub fn new(config: &RoomConfig) -> Self {
        Self {
            players: Accounts::new(),
            admin: None,
            blind_interval: config.blind_interval,
            small_blind: config.small_blind,
            game: None,
            log: Vec::new(),
            carried_pot: 0,
        }
    }

    pub fn name_of(&self, session_id: &str) -> Option<&str> {
        self.players.get(session_id).map(|account| account.name.as_str())
    }

    pub fn admin_name(&self) -> Option<&str> {
        self.admin.as_deref().and_then(|admin| self.name_of(admin))
    }

    /// Every chip in the room: balances, the live pot and the carried pot.
    /// `None` when that doesn't fit in a [`Usd`].
    pub fn total_chips(&self) -> Option<Usd> {
        let pot = self.game.as_ref().map_or(0, |game| game.pot);
        self.players
            .values()
            .try_fold(pot.checked_add(self.carried_pot)?, |total, account| {
                total.checked_add(account.balance)
            })
    }

    /// Join the room, or rename when the session has already joined.
    pub fn register(mut self, session_id: &str, name: &str, config: &RoomConfig) -> RoomResult<Self> {
        if name.chars().count() > config.max_name_length {
            return Err(RoomError::NameTooLong {
                max: config.max_name_length,
            });
        }
        if name.is_empty() || name.trim() != name || !name.chars().all(valid_name_char) {
            return Err(RoomError::InvalidCharacters);
        }
        if self
            .players
            .iter()
            .any(|(id, account)| id != session_id && account.name == name)
        {
            return Err(RoomError::NameTaken(name.to_string()));
        }

        if let Some(account) = self.players.get_mut(session_id) {
            account.name = name.to_string();
            return Ok(self);
        }
        if self.players.len() >= config.max_players {
            return Err(RoomError::RoomFull {
                max: config.max_players,
            });
        }

        self.players.insert(
            session_id.to_string(),
            Account::new(name, config.starting_balance),
        );
        if self.total_chips().is_none() {
            return Err(RoomError::ChipLimit);
        }
        if self.admin.is_none() {
            self.admin = Some(session_id.to_string());
        }
        info!("{name} joined with ${}", config.starting_balance);
        Ok(self)
    }

    /// Deal the first hand. The admin may also use this to resume a game
    /// that stopped playing itself after `max_chained_hands` hands.
    pub fn start<R: Rng>(
        mut self,
        session_id: &str,
        config: &RoomConfig,
        rng: &mut R,
    ) -> RoomResult<Self> {
        if !self.players.contains_key(session_id) {
            return Err(RoomError::NotJoined);
        }
        if self.admin.as_deref() != Some(session_id) {
            return Err(RoomError::NotAdmin);
        }

        if let Some(game) = self.game.take() {
            if game.next_to_act(&self.players).is_some() {
                return Err(RoomError::AlreadyStarted);
            }
            return self.play_on(game, config, rng);
        }

        let funded = self.players.values().filter(|a| a.balance > 0).count();
        if funded < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }
        let game = self.deal(None, rng)?.ok_or(RoomError::NotEnoughPlayers)?;
        info!("game started with {} players", game.players.len());
        self.play_on(game, config, rng)
    }

    pub fn bet<R: Rng>(
        mut self,
        session_id: &str,
        amount: Usd,
        config: &RoomConfig,
        rng: &mut R,
    ) -> RoomResult<Self> {
        let game = self.game.take().ok_or(RoomError::NoGameInProgress)?;
        let game = game.bet(&mut self.players, session_id, amount)?;
        self.play_on(game, config, rng)
    }

    pub fn fold<R: Rng>(
        mut self,
        session_id: &str,
        config: &RoomConfig,
        rng: &mut R,
    ) -> RoomResult<Self> {
        let game = self.game.take().ok_or(RoomError::NoGameInProgress)?;
        let game = game.fold(&self.players, session_id)?;
        self.play_on(game, config, rng)
    }

    /// Add `delta` chips to the named player's balance (negative to take
    /// chips away). The room's chips must still add up to a valid [`Usd`].
    pub fn adjust_balance(mut self, admin: &str, target_name: &str, delta: i64) -> RoomResult<Self> {
        if self.admin.as_deref() != Some(admin) {
            return Err(RoomError::NotAdmin);
        }
        let account = self
            .players
            .values_mut()
            .find(|account| account.name == target_name)
            .ok_or_else(|| RoomError::UnknownPlayer(target_name.to_string()))?;
        let balance = i64::from(account.balance)
            .checked_add(delta)
            .and_then(|balance| Usd::try_from(balance).ok())
            .ok_or(RoomError::InvalidAmount(delta))?;
        account.balance = balance;
        if self.total_chips().is_none() {
            return Err(RoomError::InvalidAmount(delta));
        }
        info!("{target_name} now has ${balance}");
        Ok(self)
    }

    /// Drive the hand forward until someone has to act. Finished hands are
    /// paid out and logged, and the next one is dealt straight away.
    fn play_on<R: Rng>(
        mut self,
        mut game: Game,
        config: &RoomConfig,
        rng: &mut R,
    ) -> RoomResult<Self> {
        for _ in 0..config.max_chained_hands {
            let finished = match game.advance(&self.players)? {
                Advance::Betting(game) => {
                    self.game = Some(game);
                    return Ok(self);
                }
                Advance::Showdown(finished) => finished,
            };

            let (finished, record) = finished.pay_winners(&mut self.players)?;
            self.record(record);
            match self.deal(Some(finished), rng)? {
                Some(next) => game = next,
                None => {
                    self.game = None;
                    return Ok(self);
                }
            }
        }

        warn!(
            "{} hands played out with nobody able to act, waiting for the admin",
            config.max_chained_hands
        );
        self.game = Some(game);
        Ok(self)
    }

    fn record(&mut self, record: CompletedGame) {
        self.log.push(record);
        if self.blind_interval > 0 && self.log.len() % self.blind_interval as usize == 0 {
            self.small_blind = self.small_blind.saturating_mul(2);
            info!("blinds up to ${}/${}", self.small_blind, self.small_blind.saturating_mul(2));
        }
    }

    /// Seat the next hand after `previous`, or the first hand of a game.
    ///
    /// The previous seating rotates one place so the button moves on.
    /// Players without chips sit out; funded players who weren't seated
    /// join at random places. With fewer than two seats the game is over
    /// and any unclaimed chips wait on the room.
    fn deal<R: Rng>(&mut self, previous: Option<Game>, rng: &mut R) -> RoomResult<Option<Game>> {
        let (mut seats, carried) = match previous {
            Some(game) => {
                let mut seats: Vec<SessionId> =
                    game.players.into_iter().map(|p| p.session_id).collect();
                if !seats.is_empty() {
                    seats.rotate_left(1);
                }
                (seats, game.pot)
            }
            None => (Vec::new(), self.carried_pot),
        };

        let funded = |id: &SessionId| self.players.get(id).is_some_and(|a| a.balance > 0);
        seats.retain(|id| funded(id));
        let mut newcomers: Vec<SessionId> = self
            .players
            .keys()
            .filter(|&id| funded(id) && !seats.contains(id))
            .cloned()
            .collect();
        newcomers.shuffle(rng);
        for id in newcomers {
            let at = rng.random_range(0..=seats.len());
            seats.insert(at, id);
        }

        if seats.len() < 2 {
            self.carried_pot = carried;
            info!("game over with ${carried} left unclaimed");
            return Ok(None);
        }

        self.carried_pot = 0;
        let deck = Deck::shuffled(seats.len(), rng);
        info!(
            "dealing to {} players, blinds ${}/${}",
            seats.len(),
            self.small_blind,
            self.small_blind.saturating_mul(2)
        );
        let game = Game::new(seats, carried, deck)?.post_blinds(&mut self.players, self.small_blind)?;
        Ok(Some(game))
    }
}
