//! Automated players for a poker room.
//!
//! Registers a handful of bots in one room, has the first one start the
//! game, and lets them play against each other through the same calls a
//! server would make. Runs against PostgreSQL when a database URL is
//! given, in memory otherwise.

mod bot;

use std::sync::Arc;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use poker_rooms::{
    MemoryRepository, RoomConfig, RoomManager, VersionedRepository,
    db::{Database, DatabaseConfig},
};
use rand::Rng;

use crate::bot::Bot;

const HELP: &str = "\
Play a poker room with random bots

USAGE:
  pr_bots [OPTIONS]

OPTIONS:
  --db-url     URL         PostgreSQL connection string  [default: env DATABASE_URL, or in memory]
  --room       NAME        Room to play in               [default: bots]
  --bots       N           Number of bots                [default: 4]
  --hands      N           Stop after this many hands    [default: 20]
  --seed       N           Seed for the bots' choices    [default: random]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  DB_*                     Pool settings (see DatabaseConfig)
  ROOM_*                   Room settings (see RoomConfig)
  RUST_LOG                 Log level, e.g. info or debug
";

struct Args {
    database_url: Option<String>,
    room: String,
    num_bots: usize,
    max_hands: usize,
    seed: u64,
}

async fn repository(database_url: Option<String>) -> Result<Arc<dyn VersionedRepository>, Error> {
    let config = match database_url {
        Some(database_url) => DatabaseConfig {
            database_url,
            ..DatabaseConfig::from_env().unwrap_or_default()
        },
        None if std::env::var("DATABASE_URL").is_ok() => DatabaseConfig::from_env()?,
        None => {
            info!("No database configured, keeping rooms in memory");
            return Ok(Arc::new(MemoryRepository::new()));
        }
    };

    info!("Connecting to database");
    let db = Database::new(&config)
        .await
        .context("Failed to connect to database")?;
    db.health_check().await?;
    Ok(Arc::new(db.repository().await?))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        database_url: pargs.opt_value_from_str("--db-url")?,
        room: pargs
            .opt_value_from_str("--room")?
            .unwrap_or_else(|| "bots".to_string()),
        num_bots: pargs.opt_value_from_str("--bots")?.unwrap_or(4),
        max_hands: pargs.opt_value_from_str("--hands")?.unwrap_or(20),
        seed: pargs
            .opt_value_from_str("--seed")?
            .unwrap_or_else(|| rand::rng().random()),
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = RoomConfig::from_env()?;
    if args.num_bots < 2 || args.num_bots > config.max_players {
        anyhow::bail!("--bots must be between 2 and {}", config.max_players);
    }
    let rooms = RoomManager::new(repository(args.database_url).await?, config);
    info!("Seating {} bots in {} (seed {})", args.num_bots, args.room, args.seed);

    let sessions: Vec<String> = (0..args.num_bots).map(|k| format!("bot-{k}")).collect();
    for (k, session) in sessions.iter().enumerate() {
        rooms.register(&args.room, session, &format!("bot {k}")).await?;
    }
    rooms.start(&args.room, &sessions[0]).await?;

    let handles: Vec<_> = sessions
        .iter()
        .enumerate()
        .map(|(k, session)| {
            let bot = Bot::new(
                session.clone(),
                args.room.clone(),
                k == 0,
                args.max_hands,
                args.seed.wrapping_add(k as u64),
            );
            tokio::spawn(bot.run(rooms.clone()))
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    if let Some(view) = rooms.get_player_view(&args.room, &sessions[0]).await? {
        println!("Played {} hands", view.history.len());
        for (name, balance) in &view.balances {
            println!("  {name:<8} ${balance}");
        }
    }
    Ok(())
}
