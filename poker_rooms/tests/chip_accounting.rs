//! Chips are neither created nor destroyed, whatever the players do.

use poker_rooms::{
    Game, Room, RoomConfig,
    db::{MemoryRepository, Mutation, StoreError, VersionedStore},
    entities::Usd,
};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;

fn total_chips(room: &Room) -> Usd {
    let balances: Usd = room.players.values().map(|a| a.balance).sum();
    balances + room.game.as_ref().map_or(room.carried_pot, |g| g.pot)
}

/// The pot is the largest claim still in contention plus whatever has
/// been bet in the current round.
fn pot_matches_claims(game: &Game) -> bool {
    let top_claim = game
        .players
        .iter()
        .filter_map(|p| p.eligibility.claim())
        .max()
        .unwrap_or(0);
    let round_bets: Usd = game.players.iter().map(|p| p.bet).sum();
    game.pot == top_claim + round_bets
}

fn seeded_room(players: usize, config: &RoomConfig, rng: &mut StdRng) -> Room {
    let mut room = Room::new(config);
    for k in 0..players {
        room = room
            .register(&format!("s{k}"), &format!("player {k}"), config)
            .unwrap();
    }
    room.start("s0", config, rng).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_random_play_conserves_chips(
        seed in any::<u64>(),
        players in 2usize..=6,
        blind_interval in 0u32..4,
        moves in prop::collection::vec(0u8..10, 1..300),
    ) {
        let config = RoomConfig { blind_interval, ..RoomConfig::default() };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut room = seeded_room(players, &config, &mut rng);
        let total = total_chips(&room);

        for m in moves {
            let Some(game) = room.game.as_ref() else { break };
            prop_assert!(pot_matches_claims(game));
            let Some(session) = game.next_to_act(&room.players).cloned() else { break };

            let high = game.max_bet();
            let raise = high.saturating_add(room.small_blind.saturating_mul(2 * Usd::from(m)));
            room = match m {
                0 | 1 => room.fold(&session, &config, &mut rng),
                2..=6 => room.bet(&session, high, &config, &mut rng),
                7 | 8 => room.bet(&session, raise, &config, &mut rng),
                _ => room.bet(&session, Usd::MAX, &config, &mut rng),
            }
            .unwrap();
            prop_assert_eq!(total_chips(&room), total);
        }
    }
}

#[tokio::test]
async fn test_room_survives_the_store_unchanged() {
    let config = RoomConfig::default();
    let mut rng = StdRng::seed_from_u64(5);
    let room = seeded_room(4, &config, &mut rng);

    let store: VersionedStore<Room> =
        VersionedStore::new(Arc::new(MemoryRepository::new()), "room/roundtrip");
    let written = store
        .mutate(|_| Ok::<_, StoreError>(Mutation::Write(room.clone())))
        .await
        .unwrap();
    let read = store.get().await.unwrap();

    assert_eq!(read.version, written.version);
    assert_eq!(read.value.as_ref(), Some(&room));
    assert_eq!(written.value, Some(room));
}
