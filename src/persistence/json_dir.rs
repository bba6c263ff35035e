//! One pretty-printed JSON file per record, named
//! `<match_id>_<move_index>.json`.

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::persistence::{GameRecord, GameStore};

#[derive(Debug, Clone)]
pub struct JsonDirGameStore {
    dir: PathBuf,
}

impl JsonDirGameStore {
    /// Opens the directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, match_id: &str, move_index: u32) -> PathBuf {
        self.dir.join(format!("{match_id}_{move_index}.json"))
    }

    fn read(path: &Path) -> Result<GameRecord, PersistenceError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Move indices stored for a match, parsed from the file names.
    fn indices(&self, match_id: &str) -> Result<Vec<u32>, PersistenceError> {
        let mut indices = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            let Some((id, index)) = stem.rsplit_once('_') else {
                continue;
            };
            if id == match_id {
                if let Ok(index) = index.parse() {
                    indices.push(index);
                }
            }
        }
        Ok(indices)
    }
}

// Match ids become file names
fn check_match_id(match_id: &str) -> Result<(), PersistenceError> {
    let unsafe_id = match_id.is_empty()
        || match_id.contains(['/', '\\'])
        || match_id.contains("..");
    if unsafe_id {
        return Err(PersistenceError::NotFound {
            match_id: match_id.to_string(),
            move_index: None,
        });
    }
    Ok(())
}

impl GameStore for JsonDirGameStore {
    fn save(&mut self, record: GameRecord) -> Result<(), PersistenceError> {
        check_match_id(&record.match_id)?;
        let path = self.path_for(&record.match_id, record.move_index);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&record)?)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn latest(&self, match_id: &str) -> Result<GameRecord, PersistenceError> {
        check_match_id(match_id)?;
        let Some(index) = self.indices(match_id)?.into_iter().max() else {
            return Err(PersistenceError::NotFound {
                match_id: match_id.to_string(),
                move_index: None,
            });
        };
        self.at(match_id, index)
    }

    fn at(&self, match_id: &str, move_index: u32) -> Result<GameRecord, PersistenceError> {
        check_match_id(match_id)?;
        let path = self.path_for(match_id, move_index);
        if !path.exists() {
            return Err(PersistenceError::NotFound {
                match_id: match_id.to_string(),
                move_index: Some(move_index),
            });
        }
        Self::read(&path)
    }

    fn records(&self) -> Result<Vec<GameRecord>, PersistenceError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }
}
