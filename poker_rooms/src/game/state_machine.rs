//! Betting state machine for a single hand.
//!
//! A [`Game`] is plain data: every transition consumes it and hands back
//! the next value, so a rejected action leaves the caller's copy intact.
//! Chips move between the game's pot and the room's [`Accounts`], which
//! are passed in alongside.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::{
    constants::{COMMUNITY_CARDS, HOLE_CARDS, MAX_SEATS},
    entities::{
        Accounts, Card, CompletedGame, Deck, Eligibility, PlayerAfterGame, PlayerInHand,
        SessionId, Stage, Usd,
    },
    functional::get_winners,
};

/// Errors that can occur while playing a hand
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("need to bet at least ${minimum}")]
    BetTooSmall { minimum: Usd },
    #[error("not playing")]
    UserNotPlaying,
    #[error("invalid game state: no account for {0}")]
    MissingAccount(SessionId),
    #[error("invalid game state: {seats} seats need {expected} cards but the deck holds {actual}")]
    MalformedDeck {
        seats: usize,
        expected: usize,
        actual: usize,
    },
    #[error("invalid game state: {0} is dealt twice")]
    DuplicateCard(Card),
    #[error("invalid game state: ${remaining} left in the pot with nobody to pay")]
    PotNotEmpty { remaining: Usd },
    #[error("invalid game state: paying ${payout} out of a ${pot} pot")]
    PotOverdrawn { pot: Usd, payout: Usd },
    #[error("invalid game state: payout did not finish within {bound} rounds")]
    RunawayPayout { bound: usize },
    #[error("invalid game state: chip count overflow")]
    ChipOverflow,
}

impl GameError {
    /// Whether the error points at corrupted state rather than a bad
    /// request from a player.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            Self::OutOfTurnAction | Self::BetTooSmall { .. } | Self::UserNotPlaying
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;

/// Where a hand stands after [`Game::advance`].
#[derive(Debug)]
pub enum Advance {
    /// Someone has to act.
    Betting(Game),
    /// Betting is over; the pot is ready for [`Game::pay_winners`].
    Showdown(Game),
}

/// One hand of Texas Hold'em.
///
/// Seat order is fixed for the hand. With two seats the first posts the
/// big blind and the second the small blind; otherwise the first two
/// seats post small and big blind in that order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Game {
    pub players: Vec<PlayerInHand>,
    pub pot: Usd,
    pub stage: Stage,
    pub deck: Deck,
}

impl Game {
    /// Seat `seats` in order with a stacked `deck`.
    ///
    /// `carried_pot` is money left over from an earlier hand. It starts in
    /// the pot and every seat starts with an equal claim on it.
    pub fn new(seats: Vec<SessionId>, carried_pot: Usd, deck: Deck) -> GameResult<Self> {
        let expected = HOLE_CARDS * seats.len() + COMMUNITY_CARDS;
        if seats.len() > MAX_SEATS || deck.len() != expected {
            return Err(GameError::MalformedDeck {
                seats: seats.len(),
                expected,
                actual: deck.len(),
            });
        }
        let mut seen = BTreeSet::new();
        if let Some(card) = deck.cards().iter().find(|card| !seen.insert(**card)) {
            return Err(GameError::DuplicateCard(*card));
        }

        Ok(Self {
            players: seats
                .into_iter()
                .map(|session_id| PlayerInHand::new(session_id, carried_pot))
                .collect(),
            pot: carried_pot,
            stage: Stage::PreFlop,
            deck,
        })
    }

    pub fn small_blind_idx(&self) -> usize {
        if self.players.len() == 2 { 1 } else { 0 }
    }

    pub fn big_blind_idx(&self) -> usize {
        if self.players.len() == 2 { 0 } else { 1 }
    }

    /// Post the small blind and a big blind of twice that. Short stacks
    /// post what they have. Both blinds keep their option to act.
    pub fn post_blinds(mut self, accounts: &mut Accounts, small_blind: Usd) -> GameResult<Self> {
        let small_idx = self.small_blind_idx();
        let big_idx = self.big_blind_idx();
        self.commit(small_idx, small_blind, accounts)?;
        self.commit(big_idx, small_blind.saturating_mul(2), accounts)?;
        for idx in [small_idx, big_idx] {
            self.players[idx].has_option = true;
        }
        Ok(self)
    }

    pub fn seat_of(&self, session_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.session_id == session_id)
    }

    pub fn max_bet(&self) -> Usd {
        self.players.iter().map(|p| p.bet).max().unwrap_or(0)
    }

    /// Seats that haven't folded.
    pub fn active_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !p.eligibility.is_folded())
            .count()
    }

    pub fn community_cards(&self) -> &[Card] {
        self.deck.community_cards(self.players.len(), self.stage)
    }

    pub fn hole_cards(&self, seat: usize) -> &[Card] {
        self.deck.hole_cards(seat)
    }

    fn can_act(player: &PlayerInHand, accounts: &Accounts) -> bool {
        !player.eligibility.is_folded()
            && accounts
                .get(&player.session_id)
                .is_some_and(|account| account.balance > 0)
    }

    /// Seat index of the player who must act now, if any.
    ///
    /// Starting after the first seat holding the high bet, the first
    /// player able to act who is short of it must act. When everybody has
    /// matched, the first seat (in seat order) still holding its option
    /// acts, but only while at least two players can still put chips in.
    pub fn next_to_act_idx(&self, accounts: &Accounts) -> Option<usize> {
        let num_seats = self.players.len();
        let high_idx = self
            .players
            .iter()
            .enumerate()
            .fold(0, |high, (idx, p)| if p.bet > self.players[high].bet { idx } else { high });
        let high_bet = self.players.get(high_idx)?.bet;

        let mut can_bet = 0;
        for offset in 1..=num_seats {
            let player = &self.players[(high_idx + offset) % num_seats];
            if !Self::can_act(player, accounts) {
                continue;
            }
            if player.bet < high_bet {
                return Some((high_idx + offset) % num_seats);
            }
            can_bet += 1;
        }
        if can_bet < 2 {
            return None;
        }

        self.players
            .iter()
            .position(|p| p.has_option && Self::can_act(p, accounts))
    }

    pub fn next_to_act(&self, accounts: &Accounts) -> Option<&SessionId> {
        self.next_to_act_idx(accounts)
            .map(|idx| &self.players[idx].session_id)
    }

    fn acting_seat(&self, accounts: &Accounts, session_id: &str) -> GameResult<usize> {
        let idx = self.seat_of(session_id).ok_or(GameError::UserNotPlaying)?;
        if self.next_to_act_idx(accounts) != Some(idx) {
            return Err(GameError::OutOfTurnAction);
        }
        Ok(idx)
    }

    /// Move chips from a seat's account into the pot so that its round
    /// total reaches `amount`, or as close as its balance allows.
    fn commit(&mut self, idx: usize, amount: Usd, accounts: &mut Accounts) -> GameResult<Usd> {
        let player = &mut self.players[idx];
        let account = accounts
            .get_mut(&player.session_id)
            .ok_or_else(|| GameError::MissingAccount(player.session_id.clone()))?;
        let paid = amount.saturating_sub(player.bet).min(account.balance);
        let bet = player.bet.checked_add(paid).ok_or(GameError::ChipOverflow)?;
        let pot = self.pot.checked_add(paid).ok_or(GameError::ChipOverflow)?;
        account.balance -= paid;
        player.bet = bet;
        player.has_option = false;
        self.pot = pot;
        Ok(paid)
    }

    /// Bet so that the player's total for this round is `amount`.
    ///
    /// Checking and calling are bets that match the high bet. Anything
    /// smaller is only allowed as an all-in.
    pub fn bet(mut self, accounts: &mut Accounts, session_id: &str, amount: Usd) -> GameResult<Self> {
        let idx = self.acting_seat(accounts, session_id)?;
        let high_bet = self.max_bet();
        let balance = accounts.get(session_id).map_or(0, |account| account.balance);
        let all_in = self.players[idx].bet.saturating_add(balance);
        if amount < high_bet && amount < all_in {
            return Err(GameError::BetTooSmall {
                minimum: high_bet.min(all_in),
            });
        }

        let paid = self.commit(idx, amount, accounts)?;
        debug!("{session_id} put ${paid} in, round total ${}", self.players[idx].bet);
        Ok(self)
    }

    pub fn fold(mut self, accounts: &Accounts, session_id: &str) -> GameResult<Self> {
        let idx = self.acting_seat(accounts, session_id)?;
        let player = &mut self.players[idx];
        player.eligibility = Eligibility::Folded;
        player.has_option = false;
        debug!("{session_id} folded");
        Ok(self)
    }

    /// Close the betting round: turn bets into pot claims, clear bets and
    /// give everyone their option back.
    ///
    /// A seat that bet `b` can win `b` from every seat that bet at least
    /// `b`, plus everything bet by seats that put in less.
    pub fn settle_round(mut self) -> GameResult<Self> {
        let bets: Vec<Usd> = self.players.iter().map(|p| p.bet).collect();
        for player in &mut self.players {
            let bet = player.bet;
            if let Eligibility::Active(claim) = &mut player.eligibility {
                let below = bets
                    .iter()
                    .filter(|&&b| b < bet)
                    .try_fold(0 as Usd, |sum, &b| sum.checked_add(b));
                let matched = bets.iter().filter(|&&b| b >= bet).count() as Usd;
                *claim = below
                    .and_then(|below| below.checked_add(bet.checked_mul(matched)?))
                    .and_then(|won| claim.checked_add(won))
                    .ok_or(GameError::ChipOverflow)?;
            }
            player.bet = 0;
            player.has_option = true;
        }
        Ok(self)
    }

    /// Settle rounds and deal streets until someone has to act or betting
    /// is over for the hand.
    pub fn advance(mut self, accounts: &Accounts) -> GameResult<Advance> {
        loop {
            if self.next_to_act_idx(accounts).is_some() {
                return Ok(Advance::Betting(self));
            }
            self = self.settle_round()?;
            if self.active_count() < 2 {
                return Ok(Advance::Showdown(self));
            }
            match self.stage.next() {
                Some(stage) => {
                    debug!("dealing the {stage}");
                    self.stage = stage;
                }
                None => return Ok(Advance::Showdown(self)),
            }
        }
    }

    /// Split the pot among the best hands, pot by pot.
    ///
    /// Each round pays the best contenders the smallest claim among them,
    /// split evenly, and shrinks every claim by what was paid. Contenders
    /// whose claim runs out drop. When a split no longer divides into
    /// whole dollars the leftover stays in the pot.
    pub fn pay_winners(mut self, accounts: &mut Accounts) -> GameResult<(Self, CompletedGame)> {
        let mut record = CompletedGame {
            community_cards: self.community_cards().to_vec(),
            ..CompletedGame::default()
        };
        let mut contenders: Vec<(usize, Usd)> = self
            .players
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| match p.eligibility {
                Eligibility::Active(claim) if claim > 0 => Some((idx, claim)),
                _ => None,
            })
            .collect();

        let bound = contenders.len();
        let mut rounds = 0;
        while self.pot > 0 {
            if contenders.is_empty() {
                return Err(GameError::PotNotEmpty {
                    remaining: self.pot,
                });
            }
            rounds += 1;
            if rounds > bound {
                return Err(GameError::RunawayPayout { bound });
            }

            let winners: Vec<usize> = if contenders.len() == 1 {
                vec![0]
            } else {
                let board = self.deck.community_cards(self.players.len(), Stage::River);
                get_winners(contenders.iter().enumerate().map(|(k, &(seat, _))| {
                    let mut cards = self.hole_cards(seat).to_vec();
                    cards.extend_from_slice(board);
                    (k, cards)
                }))
                .into_iter()
                .map(|(k, _)| k)
                .collect()
            };

            let smallest = winners.iter().map(|&k| contenders[k].1).min().unwrap_or(0);
            let amount = smallest / winners.len() as Usd;
            if amount == 0 {
                info!("${} can't be split evenly and stays in the pot", self.pot);
                break;
            }

            let shown = contenders.len() > 1;
            for &k in &winners {
                let seat = contenders[k].0;
                let session_id = self.players[seat].session_id.clone();
                let account = accounts
                    .get_mut(&session_id)
                    .ok_or_else(|| GameError::MissingAccount(session_id.clone()))?;
                account.balance = account
                    .balance
                    .checked_add(amount)
                    .ok_or(GameError::ChipOverflow)?;
                self.pot = self.pot.checked_sub(amount).ok_or(GameError::PotOverdrawn {
                    pot: self.pot,
                    payout: amount,
                })?;
                for (_, claim) in contenders.iter_mut() {
                    *claim = claim.saturating_sub(amount);
                }

                let entry = record
                    .players
                    .entry(session_id.clone())
                    .or_insert(PlayerAfterGame {
                        hand: None,
                        payout: 0,
                    });
                entry.payout = entry.payout.saturating_add(amount);
                if shown && entry.hand.is_none() {
                    entry.hand = Some(self.deck.hole_cards(seat).to_vec());
                }
                info!("{session_id} won ${amount}");
            }
            contenders.retain(|&(_, claim)| claim > 0);
        }

        Ok((self, record))
    }
}
