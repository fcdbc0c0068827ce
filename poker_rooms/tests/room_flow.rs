//! Rooms driven through the manager, the way a server would drive them.

use poker_rooms::{
    MemoryRepository, PlayerView, RoomConfig, RoomError, RoomManager,
    game::{GameError, entities::{Stage, Usd}},
};
use std::{sync::Arc, time::Duration};

const ROOM: &str = "table-1";

fn manager_with(config: RoomConfig) -> RoomManager {
    RoomManager::new(Arc::new(MemoryRepository::new()), config)
}

fn manager() -> RoomManager {
    manager_with(RoomConfig::default())
}

async fn view(manager: &RoomManager, session: &str) -> PlayerView {
    manager
        .get_player_view(ROOM, session)
        .await
        .unwrap()
        .expect("room exists")
}

/// Session whose turn it is, out of `sessions`.
async fn to_act(manager: &RoomManager, sessions: &[&str]) -> Option<String> {
    for session in sessions {
        let seen = view(manager, session).await;
        if seen.game.as_ref().is_some_and(|g| g.should_act_now) {
            return Some(session.to_string());
        }
    }
    None
}

async fn heads_up() -> RoomManager {
    let manager = manager();
    manager.register(ROOM, "s-alice", "alice").await.unwrap();
    manager.register(ROOM, "s-bob", "bob").await.unwrap();
    manager.start(ROOM, "s-alice").await.unwrap();
    manager
}

#[tokio::test]
async fn test_heads_up_preflop_to_flop() {
    let manager = heads_up().await;
    let sessions = ["s-alice", "s-bob"];

    let small = to_act(&manager, &sessions).await.unwrap();
    let big = sessions.iter().find(|s| **s != small).unwrap().to_string();
    let game = view(&manager, &small).await.game.unwrap();
    assert_eq!(game.pot, 3);
    assert_eq!(game.stage, Stage::PreFlop);
    assert_eq!(game.my_hole_cards.len(), 2);

    // Small blind calls, big blind checks its option.
    manager.bet(ROOM, &small, 2).await.unwrap();
    assert_eq!(to_act(&manager, &sessions).await.as_deref(), Some(big.as_str()));
    manager.bet(ROOM, &big, 2).await.unwrap();

    let game = view(&manager, &big).await.game.unwrap();
    assert_eq!(game.stage, Stage::Flop);
    assert_eq!(game.pot, 4);
    assert_eq!(game.community_cards.len(), 3);
    assert!(game.players.iter().all(|seat| seat.bet == 0));
    assert_eq!(view(&manager, &big).await.balances.values().sum::<Usd>(), 196);
}

#[tokio::test]
async fn test_rejected_action_changes_nothing() {
    let manager = heads_up().await;
    let sessions = ["s-alice", "s-bob"];
    let small = to_act(&manager, &sessions).await.unwrap();
    let big = sessions.iter().find(|s| **s != small).unwrap().to_string();

    let (before, seen_before) = manager
        .wait_player_view(ROOM, &big, 0, None)
        .await
        .unwrap();

    let err = manager.fold(ROOM, &big).await.unwrap_err();
    assert!(matches!(err, RoomError::Game(GameError::OutOfTurnAction)));
    assert_eq!(err.client_message(), "not your turn");
    let err = manager.bet(ROOM, &small, 1).await.unwrap_err();
    assert!(matches!(err, RoomError::Game(GameError::BetTooSmall { minimum: 2 })));
    let err = manager.bet(ROOM, "s-nobody", 2).await.unwrap_err();
    assert!(matches!(err, RoomError::Game(GameError::UserNotPlaying)));

    let (after, seen_after) = manager
        .wait_player_view(ROOM, &big, before, Some(Duration::from_millis(20)))
        .await
        .unwrap();
    assert_eq!(after, before);
    assert_eq!(seen_after, seen_before);
}

#[tokio::test]
async fn test_all_in_game_plays_to_a_single_winner() {
    let manager = manager();
    let sessions = ["s-a", "s-b", "s-c"];
    for (session, name) in sessions.iter().zip(["ann", "ben", "cat"]) {
        manager.register(ROOM, session, name).await.unwrap();
    }
    manager.start(ROOM, "s-a").await.unwrap();

    let mut actions = 0;
    while let Some(session) = to_act(&manager, &sessions).await {
        let seen = view(&manager, &session).await;
        let game = seen.game.unwrap();
        let total: Usd = seen.balances.values().sum::<Usd>() + game.pot;
        assert!(total <= 300);

        // Every bet is capped at what the player has, so this shoves.
        manager.bet(ROOM, &session, Usd::MAX).await.unwrap();
        actions += 1;
        assert!(actions < 1_000, "game never finished");
    }

    let seen = view(&manager, "s-a").await;
    assert!(seen.game.is_none());
    assert!(!seen.history.is_empty());
    let funded = seen.balances.values().filter(|&&b| b > 0).count();
    assert_eq!(funded, 1);
    // Splits that don't divide evenly leave at most a chip per winner behind.
    let total: Usd = seen.balances.values().sum();
    assert!(total > 300 - 3);
}

#[tokio::test]
async fn test_admin_tops_up_a_broke_player() {
    let manager = manager();
    manager.register(ROOM, "s-alice", "alice").await.unwrap();
    manager.register(ROOM, "s-bob", "bob").await.unwrap();

    manager.adjust_balance(ROOM, "s-alice", "bob", -100).await.unwrap();
    let err = manager.start(ROOM, "s-alice").await.unwrap_err();
    assert!(matches!(err, RoomError::NotEnoughPlayers));

    let err = manager.adjust_balance(ROOM, "s-bob", "bob", 50).await.unwrap_err();
    assert!(matches!(err, RoomError::NotAdmin));
    let err = manager.adjust_balance(ROOM, "s-alice", "bob", -1).await.unwrap_err();
    assert!(matches!(err, RoomError::InvalidAmount(-1)));

    manager.adjust_balance(ROOM, "s-alice", "bob", 50).await.unwrap();
    assert_eq!(view(&manager, "s-bob").await.balances["bob"], 50);
    manager.start(ROOM, "s-alice").await.unwrap();
    assert!(view(&manager, "s-bob").await.game.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_all_land() {
    let manager = manager();
    let handles: Vec<_> = (0..8)
        .map(|k| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .register(ROOM, &format!("s-{k}"), &format!("player {k}"))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let seen = view(&manager, "s-0").await;
    assert_eq!(seen.balances.len(), 8);
    assert!(seen.admin_name.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_registrations_respect_the_cap() {
    let config = RoomConfig {
        max_players: 3,
        ..RoomConfig::default()
    };
    let manager = manager_with(config);
    let handles: Vec<_> = (0..6)
        .map(|k| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.register(ROOM, &format!("s-{k}"), &format!("p{k}")).await })
        })
        .collect();

    let mut joined = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(err) => assert!(matches!(err, RoomError::RoomFull { max: 3 })),
        }
    }
    assert_eq!(joined, 3);
}

#[tokio::test]
async fn test_long_poll_wakes_on_change() {
    let manager = manager();
    let since = manager.register(ROOM, "s-alice", "alice").await.unwrap();

    let waiter = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .wait_player_view(ROOM, "s-alice", since, Some(Duration::from_secs(10)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let next = manager.register(ROOM, "s-bob", "bob").await.unwrap();

    let (version, seen) = waiter.await.unwrap().unwrap();
    assert_eq!(version, next);
    assert!(version > since);
    assert_eq!(seen.unwrap().balances.len(), 2);
}

#[tokio::test]
async fn test_long_poll_is_capped() {
    let config = RoomConfig {
        long_poll_timeout: Duration::from_millis(50),
        ..RoomConfig::default()
    };
    let manager = manager_with(config);
    let since = manager.register(ROOM, "s-alice", "alice").await.unwrap();

    let started = tokio::time::Instant::now();
    let (version, _) = manager
        .wait_player_view(ROOM, "s-alice", since, Some(Duration::from_secs(3600)))
        .await
        .unwrap();
    assert_eq!(version, since);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_deleted_room_starts_over() {
    let manager = heads_up().await;
    manager.delete_room(ROOM).await.unwrap();
    assert_eq!(manager.get_player_view(ROOM, "s-alice").await.unwrap(), None);

    manager.register(ROOM, "s-bob", "bob").await.unwrap();
    let seen = view(&manager, "s-bob").await;
    assert_eq!(seen.admin_name.as_deref(), Some("bob"));
    assert_eq!(seen.balances.len(), 1);
}
