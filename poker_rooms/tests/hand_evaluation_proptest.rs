//! Property-based tests for hand evaluation.

use poker_rooms::game::{
    entities::{Card, Deck, Rank},
    functional::{argmax, eval, get_winners},
};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// `n` distinct cards drawn from a shuffled deck.
fn unique_cards(n: usize) -> impl Strategy<Value = Vec<Card>> {
    Just(Deck::standard())
        .prop_shuffle()
        .prop_map(move |cards| cards.into_iter().take(n).collect())
}

/// Several players' hole cards plus a shared board, all distinct.
fn table(players: usize) -> impl Strategy<Value = (Vec<Vec<Card>>, Vec<Card>)> {
    unique_cards(players * 2 + 5).prop_map(move |cards| {
        let holes = cards[..players * 2].chunks(2).map(<[Card]>::to_vec).collect();
        (holes, cards[players * 2..].to_vec())
    })
}

proptest! {
    #[test]
    fn test_eval_makes_five_cards_from_the_input(cards in unique_cards(7)) {
        let hand = eval(&cards);
        prop_assert_eq!(hand.cards.len(), 5);

        let input: BTreeSet<_> = cards.iter().collect();
        let made: BTreeSet<_> = hand.cards.iter().collect();
        prop_assert_eq!(made.len(), 5, "cards in a hand are distinct");
        prop_assert!(made.is_subset(&input));
    }

    #[test]
    fn test_eval_ignores_card_order(cards in unique_cards(7), rotation in 0usize..7) {
        let mut reordered = cards.clone();
        reordered.rotate_left(rotation);
        reordered.reverse();
        prop_assert_eq!(eval(&cards), eval(&reordered));
    }

    #[test]
    fn test_more_cards_never_make_a_worse_hand(cards in unique_cards(7)) {
        let five = eval(&cards[..5]);
        let six = eval(&cards[..6]);
        let seven = eval(&cards);
        prop_assert!(five <= six);
        prop_assert!(six <= seven);
    }

    #[test]
    fn test_flush_ranks_are_single_suited(cards in unique_cards(7)) {
        let hand = eval(&cards);
        if matches!(hand.rank, Rank::Flush | Rank::StraightFlush) {
            let suits: BTreeSet<_> = hand.cards.iter().map(|card| card.1).collect();
            prop_assert_eq!(suits.len(), 1);
        }
    }

    #[test]
    fn test_winners_hold_the_best_hand((holes, board) in table(4)) {
        let hands: Vec<_> = holes
            .iter()
            .map(|hole| {
                let mut cards = hole.clone();
                cards.extend_from_slice(&board);
                cards
            })
            .collect();
        let evaluated: Vec<_> = hands.iter().map(|cards| eval(cards)).collect();

        let winners = get_winners(hands.iter().cloned().enumerate());
        prop_assert!(!winners.is_empty());

        let best = evaluated.iter().max().unwrap();
        for (idx, hand) in &winners {
            prop_assert_eq!(hand, best);
            prop_assert_eq!(&evaluated[*idx], best);
        }
        let indices: Vec<usize> = winners.iter().map(|(idx, _)| *idx).collect();
        prop_assert_eq!(indices, argmax(&evaluated));
    }

    #[test]
    fn test_a_shared_board_that_plays_ties_everyone(board in unique_cards(5)) {
        // With only the board to play, everybody holds the same hand.
        let hands = (0..3).map(|k| (k, board.clone()));
        prop_assert_eq!(get_winners(hands).len(), 3);
    }
}

#[test]
fn test_get_winners_on_no_hands() {
    let none: Vec<(usize, Vec<Card>)> = Vec::new();
    assert!(get_winners(none).is_empty());
    assert!(argmax(&[]).is_empty());
}
