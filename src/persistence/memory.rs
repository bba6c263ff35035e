use std::collections::BTreeMap;

use crate::error::PersistenceError;
use crate::persistence::{GameRecord, GameStore};

/// Keeps every record in process memory. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryGameStore {
    records: BTreeMap<(String, u32), GameRecord>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GameStore for MemoryGameStore {
    fn save(&mut self, record: GameRecord) -> Result<(), PersistenceError> {
        self.records
            .insert((record.match_id.clone(), record.move_index), record);
        Ok(())
    }

    fn latest(&self, match_id: &str) -> Result<GameRecord, PersistenceError> {
        self.records
            .values()
            .filter(|record| record.match_id == match_id)
            .max_by_key(|record| record.move_index)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound {
                match_id: match_id.to_string(),
                move_index: None,
            })
    }

    fn at(&self, match_id: &str, move_index: u32) -> Result<GameRecord, PersistenceError> {
        self.records
            .get(&(match_id.to_string(), move_index))
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound {
                match_id: match_id.to_string(),
                move_index: Some(move_index),
            })
    }

    fn records(&self) -> Result<Vec<GameRecord>, PersistenceError> {
        Ok(self.records.values().cloned().collect())
    }
}
