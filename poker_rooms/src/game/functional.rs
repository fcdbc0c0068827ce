//! Hand evaluation.
//!
//! [`eval`] picks the best five cards out of any five to nine, and
//! [`get_winners`] compares several players' cards at once. Evaluation is
//! independent of the order cards are passed in.

use std::cmp::Ordering;

use super::{
    constants::{ACE, HAND_SIZE},
    entities::{Card, Rank, Value},
};

/// The best five cards a player can make, strongest component first.
///
/// Hands compare by rank and then by card values. Suits never break
/// ties, so two hands that differ only in suits are equal.
#[derive(Clone, Debug)]
pub struct Hand {
    pub rank: Rank,
    pub cards: Vec<Card>,
}

impl Hand {
    /// Tie-break values, most significant first. A wheel's ace counts as
    /// one so that 5-high is the lowest straight.
    pub fn values(&self) -> Vec<Value> {
        let mut values: Vec<Value> = self.cards.iter().map(|card| card.0).collect();
        let is_straight = matches!(self.rank, Rank::Straight | Rank::StraightFlush);
        if is_straight && values.first() == Some(&5) {
            if let Some(ace) = values.last_mut() {
                *ace = 1;
            }
        }
        values
    }
}

impl PartialEq for Hand {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Hand {}

impl PartialOrd for Hand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.values().cmp(&other.values()))
    }
}

/// Cards grouped by value; index 14 holds aces. Each group is sorted by
/// suit.
type Groups = [Vec<Card>; ACE as usize + 1];

/// Highest value first, suits in a fixed order within a value.
fn sorted(cards: &[Card]) -> Vec<Card> {
    let mut cards = cards.to_vec();
    cards.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    cards
}

fn group_by_value(sorted: &[Card]) -> Groups {
    let mut groups: Groups = std::array::from_fn(|_| Vec::new());
    for card in sorted {
        if let Some(group) = groups.get_mut(usize::from(card.0)) {
            group.push(*card);
        }
    }
    groups
}

/// Highest five-card run, with aces also playing below the deuce.
fn find_straight(groups: &Groups) -> Option<Vec<Card>> {
    (5..=ACE).rev().find_map(|high| {
        (0..HAND_SIZE as Value)
            .map(|offset| {
                let value = match high - offset {
                    1 => ACE,
                    v => v,
                };
                groups[usize::from(value)].first().copied()
            })
            .collect()
    })
}

/// Best flush or straight flush, if five cards share a suit.
fn find_flush(sorted: &[Card]) -> Option<Hand> {
    super::entities::SUITS
        .into_iter()
        .filter_map(|suit| {
            let suited: Vec<Card> = sorted.iter().filter(|card| card.1 == suit).copied().collect();
            if suited.len() < HAND_SIZE {
                return None;
            }
            let hand = match find_straight(&group_by_value(&suited)) {
                Some(cards) => Hand {
                    rank: Rank::StraightFlush,
                    cards,
                },
                None => Hand {
                    rank: Rank::Flush,
                    cards: suited[..HAND_SIZE].to_vec(),
                },
            };
            Some(hand)
        })
        .max()
}

/// Quads, boats, sets, pairs, or high card, filled out with the highest
/// remaining kickers.
fn find_multiples(sorted: &[Card], groups: &Groups) -> Hand {
    // Largest groups first; equal sizes stay highest value first.
    let mut sets: Vec<&Vec<Card>> = groups.iter().rev().filter(|g| !g.is_empty()).collect();
    sets.sort_by(|a, b| b.len().cmp(&a.len()));

    let first = sets.first().map_or(0, |g| g.len());
    let second = sets.get(1).map_or(0, |g| g.len());
    let mut made: Vec<Card> = Vec::with_capacity(HAND_SIZE);
    let rank = match (first, second) {
        (4, _) => {
            made.extend(sets[0]);
            Rank::FourOfAKind
        }
        (3, 2..) => {
            made.extend(sets[0]);
            // The pair part is the highest other group of two or more,
            // which may be a second set.
            if let Some(pair) = sets[1..]
                .iter()
                .filter(|g| g.len() >= 2)
                .max_by_key(|g| g[0].0)
            {
                made.extend(&pair[..2]);
            }
            Rank::FullHouse
        }
        (3, _) => {
            made.extend(sets[0]);
            Rank::ThreeOfAKind
        }
        (2, 2) => {
            made.extend(sets[0]);
            made.extend(sets[1]);
            Rank::TwoPair
        }
        (2, _) => {
            made.extend(sets[0]);
            Rank::OnePair
        }
        _ => Rank::HighCard,
    };

    let kickers: Vec<Card> = sorted
        .iter()
        .filter(|card| !made.contains(card))
        .take(HAND_SIZE.saturating_sub(made.len()))
        .copied()
        .collect();
    made.extend(kickers);
    Hand { rank, cards: made }
}

/// Evaluate the best hand that can be made from `cards`.
///
/// Meant for five to nine unique cards. Fewer cards still evaluate, with
/// a shorter [`Hand::cards`].
pub fn eval(cards: &[Card]) -> Hand {
    let sorted = sorted(cards);
    let groups = group_by_value(&sorted);

    let flush = find_flush(&sorted);
    if let Some(hand) = flush.as_ref().filter(|h| h.rank == Rank::StraightFlush) {
        return hand.clone();
    }

    let multiples = find_multiples(&sorted, &groups);
    if multiples.rank >= Rank::FullHouse {
        return multiples;
    }
    if let Some(hand) = flush {
        return hand;
    }
    if let Some(cards) = find_straight(&groups) {
        return Hand {
            rank: Rank::Straight,
            cards,
        };
    }
    multiples
}

/// Indices of the strongest hands. Several indices mean a tie.
pub fn argmax(hands: &[Hand]) -> Vec<usize> {
    let Some(best) = hands.iter().max() else {
        return Vec::new();
    };
    hands
        .iter()
        .enumerate()
        .filter(|(_, hand)| *hand == best)
        .map(|(idx, _)| idx)
        .collect()
}

/// Evaluate every owner's cards and keep the owners that tie for best,
/// along with their evaluated hands. Empty input gives no winners.
pub fn get_winners<K, I>(hands: I) -> Vec<(K, Hand)>
where
    I: IntoIterator<Item = (K, Vec<Card>)>,
{
    let evaluated: Vec<(K, Hand)> = hands
        .into_iter()
        .map(|(owner, cards)| (owner, eval(&cards)))
        .collect();
    let Some(best) = evaluated.iter().map(|(_, hand)| hand).max().cloned() else {
        return Vec::new();
    };
    evaluated
        .into_iter()
        .filter(|(_, hand)| *hand == best)
        .collect()
}
