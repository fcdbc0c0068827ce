//! Room operations against a shared store.
//!
//! Each operation reads the room, applies one pure transition, and writes
//! the result back only if nobody else wrote in between, retrying
//! otherwise. Nothing is locked in process, so any number of managers
//! (in any number of processes) can serve the same rooms.

use log::{debug, error, info};
use std::{sync::Arc, time::Duration};

use super::{
    config::RoomConfig,
    errors::{RoomError, RoomResult},
    models::Room,
    view::PlayerView,
};
use crate::{
    db::{Mutation, StoreError, Version, VersionedRepository, VersionedStore},
    game::entities::Usd,
};

fn room_key(room: &str) -> String {
    format!("room/{room}")
}

/// Store errors are logged where they surface.
fn logged(room: &str, err: RoomError) -> RoomError {
    if let RoomError::Store(e) = &err {
        error!("store failure in room {room}: {e}");
    }
    err
}

#[derive(Clone)]
pub struct RoomManager {
    repository: Arc<dyn VersionedRepository>,
    config: RoomConfig,
}

impl RoomManager {
    pub fn new(repository: Arc<dyn VersionedRepository>, config: RoomConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    fn store(&self, room: &str) -> VersionedStore<Room> {
        VersionedStore::new(self.repository.clone(), room_key(room))
    }

    /// Run `transition` against the stored room until it commits. An
    /// unchanged room isn't written, so its version stays put.
    async fn apply<F>(&self, room: &str, mut transition: F) -> RoomResult<Version>
    where
        F: FnMut(Option<Room>) -> RoomResult<Room>,
    {
        let committed = self
            .store(room)
            .mutate(|current| {
                let before = current.clone();
                let after = transition(current)?;
                if before.as_ref() == Some(&after) {
                    Ok(Mutation::NoChange)
                } else {
                    Ok(Mutation::Write(after))
                }
            })
            .await
            .map_err(|e| logged(room, e))?;
        Ok(committed.version)
    }

    /// Join `room` as `name`, creating the room on first use. Registering
    /// again from the same session renames it.
    pub async fn register(&self, room: &str, session_id: &str, name: &str) -> RoomResult<Version> {
        let version = self
            .apply(room, |current| {
                let existing = current.unwrap_or_else(|| {
                    info!("creating room {room}");
                    Room::new(&self.config)
                });
                existing.register(session_id, name, &self.config)
            })
            .await?;
        debug!("{session_id} registered in {room} as {name}");
        Ok(version)
    }

    pub async fn start(&self, room: &str, session_id: &str) -> RoomResult<Version> {
        let version = self
            .apply(room, |current| {
                current
                    .ok_or(RoomError::NotJoined)?
                    .start(session_id, &self.config, &mut rand::rng())
            })
            .await?;
        info!("{room} started");
        Ok(version)
    }

    pub async fn bet(&self, room: &str, session_id: &str, amount: Usd) -> RoomResult<Version> {
        self.apply(room, |current| {
            current
                .ok_or_else(|| RoomError::RoomNotFound(room.to_string()))?
                .bet(session_id, amount, &self.config, &mut rand::rng())
        })
        .await
    }

    pub async fn fold(&self, room: &str, session_id: &str) -> RoomResult<Version> {
        self.apply(room, |current| {
            current
                .ok_or_else(|| RoomError::RoomNotFound(room.to_string()))?
                .fold(session_id, &self.config, &mut rand::rng())
        })
        .await
    }

    pub async fn adjust_balance(
        &self,
        room: &str,
        admin: &str,
        target_name: &str,
        delta: i64,
    ) -> RoomResult<Version> {
        self.apply(room, |current| {
            current
                .ok_or_else(|| RoomError::RoomNotFound(room.to_string()))?
                .adjust_balance(admin, target_name, delta)
        })
        .await
    }

    /// The room as `session_id` sees it, or `None` if there's no such room.
    pub async fn get_player_view(
        &self,
        room: &str,
        session_id: &str,
    ) -> RoomResult<Option<PlayerView>> {
        let current = self
            .store(room)
            .get()
            .await
            .map_err(|e| logged(room, e.into()))?;
        Ok(current.value.map(|r| r.player_view(session_id)))
    }

    /// Long-poll for a version of the room newer than `since`.
    ///
    /// The wait is capped at the configured long-poll timeout. On timeout
    /// the current state comes back unchanged, so callers compare versions
    /// to tell the two apart.
    pub async fn wait_player_view(
        &self,
        room: &str,
        session_id: &str,
        since: Version,
        timeout: Option<Duration>,
    ) -> RoomResult<(Version, Option<PlayerView>)> {
        let timeout = timeout
            .unwrap_or(self.config.long_poll_timeout)
            .min(self.config.long_poll_timeout);
        let current = self
            .store(room)
            .wait(since, timeout)
            .await
            .map_err(|e| logged(room, RoomError::from(e)))?;
        if current.version <= since {
            debug!("long-poll on {room} timed out at version {since}");
        }
        Ok((
            current.version,
            current.value.map(|r| r.player_view(session_id)),
        ))
    }

    pub async fn delete_room(&self, room: &str) -> RoomResult<()> {
        self.store(room)
            .delete()
            .await
            .map_err(|e: StoreError| logged(room, e.into()))?;
        info!("{room} deleted");
        Ok(())
    }
}
