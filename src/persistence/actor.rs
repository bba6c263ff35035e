use actix::prelude::*;
use log::{error, info};

use crate::error::PersistenceError;
use crate::persistence::{list_saved_games, GameRecord, GameStore, PersistenceSink, SavedGameInfo};

/// Owns the game store on a dedicated `SyncArbiter` thread so disk access
/// never runs on the host's event loop.
pub struct PersistenceActor {
    store: Box<dyn GameStore + Send>,
}

impl PersistenceActor {
    pub fn new(store: impl GameStore + Send + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }
}

impl Actor for PersistenceActor {
    type Context = SyncContext<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("Persistence worker started");
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct SaveRecord(pub GameRecord);

#[derive(Message)]
#[rtype(result = "Result<GameRecord, PersistenceError>")]
pub struct LoadRecord {
    pub match_id: String,
    pub move_index: Option<u32>,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<SavedGameInfo>, PersistenceError>")]
pub struct ListRecords {
    pub limit: usize,
}

impl Handler<SaveRecord> for PersistenceActor {
    type Result = ();

    fn handle(&mut self, SaveRecord(record): SaveRecord, _: &mut Self::Context) {
        let (match_id, move_index, state_type) =
            (record.match_id.clone(), record.move_index, record.state_type);
        match self.store.save(record) {
            Ok(()) => info!("Saved {:?} for {} at move {}", state_type, match_id, move_index),
            Err(e) => error!("Error persisting {} at move {}: {}", match_id, move_index, e),
        }
    }
}

impl Handler<LoadRecord> for PersistenceActor {
    type Result = Result<GameRecord, PersistenceError>;

    fn handle(&mut self, msg: LoadRecord, _: &mut Self::Context) -> Self::Result {
        self.store.load(&msg.match_id, msg.move_index)
    }
}

impl Handler<ListRecords> for PersistenceActor {
    type Result = Result<Vec<SavedGameInfo>, PersistenceError>;

    fn handle(&mut self, msg: ListRecords, _: &mut Self::Context) -> Self::Result {
        list_saved_games(self.store.as_ref(), msg.limit)
    }
}

impl PersistenceSink for Addr<PersistenceActor> {
    fn submit(&mut self, record: GameRecord) {
        self.do_send(SaveRecord(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CosmeticOverlay, StateType};
    use crate::persistence::MemoryGameStore;

    #[actix_rt::test]
    async fn saved_records_can_be_loaded_and_listed() {
        let addr = SyncArbiter::start(1, || PersistenceActor::new(MemoryGameStore::new()));
        let mut sink = addr.clone();
        for move_index in [0, 1, 2] {
            sink.submit(GameRecord::new(
                "match_a",
                "position",
                StateType::MidgameState,
                move_index,
                Default::default(),
                CosmeticOverlay::default(),
            ));
        }

        let record = addr
            .send(LoadRecord {
                match_id: "match_a".to_string(),
                move_index: None,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.move_index, 2);

        let games = addr.send(ListRecords { limit: 5 }).await.unwrap().unwrap();
        assert_eq!(games.len(), 1);

        let missing = addr
            .send(LoadRecord {
                match_id: "match_b".to_string(),
                move_index: Some(1),
            })
            .await
            .unwrap();
        assert!(matches!(missing, Err(PersistenceError::NotFound { .. })));
    }
}
