//! Hand Evaluation Example
//!
//! Evaluates hands given as card codes and picks the winners.
//!
//! ```text
//! cargo run --example hand_evaluation -- 3C9S5DJSQC AHAS ADAC TDTS
//! ```
//!
//! The first argument is the board, every other argument a player's hole
//! cards. Without arguments a fixed showdown is used.

use poker_rooms::{
    entities::{Card, parse_cards},
    functional::{eval, get_winners},
};

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        args = ["3C9S5DJSQC", "AHAS", "ADAC", "TDTS", "2H3D"]
            .map(String::from)
            .to_vec();
    }

    let parsed: Result<Vec<Vec<Card>>, _> = args.iter().map(|codes| parse_cards(codes)).collect();
    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let (board, holes) = parsed.split_at(1);
    let board = &board[0];

    let show = |cards: &[Card]| cards.iter().map(Card::to_string).collect::<Vec<_>>().join(" ");
    println!("Board: {}\n", show(board));

    let hands: Vec<(usize, Vec<Card>)> = holes
        .iter()
        .enumerate()
        .map(|(player, hole)| {
            let mut cards = hole.clone();
            cards.extend_from_slice(board);
            (player, cards)
        })
        .collect();

    for (player, cards) in &hands {
        let hand = eval(cards);
        println!(
            "Player {}: {:<8} -> {} ({})",
            player + 1,
            show(&holes[*player]),
            hand.rank,
            show(&hand.cards)
        );
    }

    let winners = get_winners(hands);
    let names: Vec<String> = winners.iter().map(|(player, _)| format!("Player {}", player + 1)).collect();
    match winners.first() {
        Some((_, hand)) if winners.len() > 1 => println!("\nSplit pot with {}: {}", hand.rank, names.join(", ")),
        Some((_, hand)) => println!("\n{} wins with {}", names.join(""), hand.rank),
        None => println!("\nNo players"),
    }
}
