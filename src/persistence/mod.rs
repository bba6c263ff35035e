//! Saved match records and where they go.
//!
//! The host never waits on storage while arbitrating a move: records are
//! handed to a [`PersistenceSink`] and forgotten. Loads and listings go
//! through a [`GameStore`], which the binary drives from a
//! [`actor::PersistenceActor`] running on its own thread.

pub mod actor;
pub mod json_dir;
pub mod memory;

use log::error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

use crate::error::PersistenceError;
use crate::models::{CosmeticOverlay, ParticipantIdentity, Side, StateType};

pub use actor::PersistenceActor;
pub use json_dir::JsonDirGameStore;
pub use memory::MemoryGameStore;

/// One snapshot of a match, written on every state change worth keeping.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub match_id: String,
    pub serialized_position: String,
    pub state_type: StateType,
    pub move_index: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub participant_side_map: BTreeMap<ParticipantIdentity, Side>,
    pub cosmetic_overlay: CosmeticOverlay,
}

impl GameRecord {
    /// Builds a record stamped with the current time.
    pub fn new(
        match_id: impl Into<String>,
        serialized_position: impl Into<String>,
        state_type: StateType,
        move_index: u32,
        participant_side_map: BTreeMap<ParticipantIdentity, Side>,
        cosmetic_overlay: CosmeticOverlay,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            serialized_position: serialized_position.into(),
            state_type,
            move_index,
            timestamp: OffsetDateTime::now_utc(),
            participant_side_map,
            cosmetic_overlay,
        }
    }

    pub fn info(&self) -> SavedGameInfo {
        SavedGameInfo {
            match_id: self.match_id.clone(),
            move_index: self.move_index,
            state_type: self.state_type,
            timestamp: self.timestamp,
            player_count: self.participant_side_map.len(),
        }
    }
}

/// Listing entry answered to `list_saved_games`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SavedGameInfo {
    pub match_id: String,
    pub move_index: u32,
    pub state_type: StateType,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub player_count: usize,
}

pub trait GameStore {
    /// Stores a record, replacing any earlier one for the same match and
    /// move index.
    fn save(&mut self, record: GameRecord) -> Result<(), PersistenceError>;

    /// The record with the highest move index for the match.
    fn latest(&self, match_id: &str) -> Result<GameRecord, PersistenceError>;

    fn at(&self, match_id: &str, move_index: u32) -> Result<GameRecord, PersistenceError>;

    fn records(&self) -> Result<Vec<GameRecord>, PersistenceError>;

    fn load(
        &self,
        match_id: &str,
        move_index: Option<u32>,
    ) -> Result<GameRecord, PersistenceError> {
        match move_index {
            Some(move_index) => self.at(match_id, move_index),
            None => self.latest(match_id),
        }
    }
}

/// One entry per match, newest first.
///
/// A match is represented by its `end_state` record when it has one, and by
/// its furthest record otherwise.
pub fn list_saved_games<S: GameStore + ?Sized>(
    store: &S,
    limit: usize,
) -> Result<Vec<SavedGameInfo>, PersistenceError> {
    let mut per_match: HashMap<String, GameRecord> = HashMap::new();
    for record in store.records()? {
        match per_match.get(&record.match_id) {
            Some(current) if !supersedes(&record, current) => {}
            _ => {
                per_match.insert(record.match_id.clone(), record);
            }
        }
    }

    let mut games: Vec<SavedGameInfo> = per_match.values().map(GameRecord::info).collect();
    games.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.match_id.cmp(&b.match_id))
    });
    games.truncate(limit);
    Ok(games)
}

fn supersedes(candidate: &GameRecord, current: &GameRecord) -> bool {
    let is_end = |r: &GameRecord| r.state_type == StateType::EndState;
    match (is_end(candidate), is_end(current)) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.move_index > current.move_index,
    }
}

/// Where the host hands records off. Submitting never blocks on storage
/// and never fails from the host's point of view.
pub trait PersistenceSink {
    fn submit(&mut self, record: GameRecord);
}

/// A store shared between the host and in-process readers.
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GameStore> SharedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl<S: GameStore> PersistenceSink for SharedStore<S> {
    fn submit(&mut self, record: GameRecord) {
        let (match_id, move_index) = (record.match_id.clone(), record.move_index);
        if let Err(e) = self.with(|store| store.save(record)) {
            error!("Error persisting {} at move {}: {}", match_id, move_index, e);
        }
    }
}
