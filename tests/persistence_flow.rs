mod common;

use pretty_assertions::assert_eq;

use common::{Table, MATCH_ID};
use turn_arbiter_chess::game::ChessEngine;
use turn_arbiter_chess::host::{Host, HostEvent};
use turn_arbiter_chess::models::{
    ClientMessage, ConnectionId, ParticipantIdentity, Recipient, ServerMessage, Side, StateType,
};
use turn_arbiter_chess::persistence::{GameStore, JsonDirGameStore, MemoryGameStore, SharedStore};

const ITALIAN: [(u64, &str, &str); 12] = [
    (1, "e2", "e4"),
    (2, "e7", "e5"),
    (1, "g1", "f3"),
    (2, "b8", "c6"),
    (1, "f1", "c4"),
    (2, "g8", "f6"),
    (1, "d2", "d3"),
    (2, "f8", "c5"),
    (1, "b1", "c3"),
    (2, "d7", "d6"),
    (1, "e1", "g1"),
    (2, "c8", "g4"),
];

fn played() -> Table {
    let mut table = Table::new();
    table.join(1, "A");
    table.join(2, "B");
    for (connection, from, to) in ITALIAN {
        table.propose(connection, from, to);
    }
    assert_eq!(table.host.coordinator().move_index(), 12);
    table
}

fn load(match_id: &str, move_index: Option<u32>) -> ClientMessage {
    ClientMessage::LoadGame {
        match_id: match_id.to_string(),
        move_index,
    }
}

#[test]
fn every_accepted_move_is_recorded() {
    let table = played();
    let records = table.store.with(|s| s.records()).unwrap();
    assert_eq!(records.len(), 13);

    let latest = table.store.with(|s| s.latest(MATCH_ID)).unwrap();
    assert_eq!(latest.state_type, StateType::MidgameState);
    assert_eq!(latest.serialized_position, table.host.coordinator().serialized_position());
    assert_eq!(
        latest.participant_side_map.get(&ParticipantIdentity::new("B")),
        Some(&Side::Black)
    );
}

#[test]
fn loading_move_ten_resynchronizes_everyone() {
    let mut table = played();
    let saved = table.store.with(|s| s.at(MATCH_ID, 10)).unwrap();
    table.clear_received();

    table.send(2, load(MATCH_ID, Some(10)));

    assert_eq!(table.host.coordinator().move_index(), 10);
    assert_eq!(table.host.coordinator().serialized_position(), saved.serialized_position);
    assert_eq!(table.host.arbiter().current(), Side::White);
    for connection in [1, 2] {
        let received = table.received(connection);
        assert_eq!(
            received[..2].to_vec(),
            vec![
                ServerMessage::BoardSynced {
                    position: saved.serialized_position.clone(),
                    move_index: 10,
                },
                ServerMessage::TurnChanged { side: Side::White },
            ]
        );
        assert_eq!(table.view(connection).position(), saved.serialized_position);
        assert_eq!(table.view(connection).turn(), Side::White);
    }

    // Play resumes from the loaded position
    table.propose(1, "e1", "g1");
    assert_eq!(table.host.coordinator().move_index(), 11);
}

#[test]
fn loading_an_odd_index_hands_the_turn_to_black() {
    let mut table = played();
    table.send(1, load(MATCH_ID, Some(9)));
    assert_eq!(table.host.arbiter().current(), Side::Black);
    assert!(table.view(2).pieces_enabled());
    assert!(!table.view(1).pieces_enabled());
}

#[test]
fn a_new_host_adopts_a_saved_match() {
    let old = played();
    let mut table = Table::with_store(old.store.clone(), "match_fresh");
    table.join(1, "A");
    table.join(2, "B");

    table.send(1, load(MATCH_ID, None));

    assert_eq!(table.host.match_id(), MATCH_ID);
    assert_eq!(table.host.coordinator().move_index(), 12);
    assert_eq!(table.view(2).position(), old.host.coordinator().serialized_position());
    assert_eq!(table.view(2).turn(), Side::White);
}

#[test]
fn cosmetics_survive_a_load() {
    let mut table = Table::new();
    table.join(1, "A");
    table.join(2, "B");
    table.send(
        2,
        ClientMessage::SetCosmetic {
            skin: "marble".to_string(),
        },
    );
    table.propose(1, "e2", "e4");

    let mut other = Table::with_store(table.store.clone(), "match_other");
    other.join(5, "C");
    other.send(5, load(MATCH_ID, Some(1)));
    assert_eq!(other.host.overlay().get(Side::Black), Some("marble"));
    assert_eq!(other.view(5).overlay().get(Side::Black), Some("marble"));
}

#[test]
fn missing_save_is_reported_to_the_requester_only() {
    let mut table = played();
    table.clear_received();
    let before = table.host.coordinator().serialized_position();

    let envelopes = table.send(1, load("match_missing", Some(3)));

    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].recipient, Recipient::One(ConnectionId(1)));
    assert_eq!(
        envelopes[0].message,
        ServerMessage::Error {
            error: "no saved state for match match_missing at move 3".to_string(),
        }
    );
    assert!(table.received(2).is_empty());
    assert_eq!(table.host.coordinator().serialized_position(), before);
}

#[test]
fn listing_shows_one_entry_per_match() {
    let mut table = played();
    table.send(1, ClientMessage::SaveGame);

    let mut other = Table::with_store(table.store.clone(), "match_other");
    other.join(1, "C");
    other.send(1, ClientMessage::Resign {
        identity: ParticipantIdentity::new("C"),
    });

    let envelopes = table.send(2, ClientMessage::ListSavedGames { limit: None });
    let ServerMessage::SavedGames { games } = &envelopes[0].message else {
        panic!("expected a listing, got {:?}", envelopes[0].message);
    };
    assert_eq!(games.len(), 2);

    let ours = games.iter().find(|g| g.match_id == MATCH_ID).unwrap();
    assert_eq!(ours.move_index, 12);
    assert_eq!(ours.state_type, StateType::ManualSave);
    let theirs = games.iter().find(|g| g.match_id == "match_other").unwrap();
    assert_eq!(theirs.state_type, StateType::EndState);

    let envelopes = table.send(2, ClientMessage::ListSavedGames { limit: Some(1) });
    assert!(matches!(
        &envelopes[0].message,
        ServerMessage::SavedGames { games } if games.len() == 1
    ));
}

#[test]
fn json_directory_store_round_trip() {
    let dir = std::env::temp_dir().join(format!(
        "turn_arbiter_chess_{}",
        uuid::Uuid::new_v4().simple()
    ));
    let store = SharedStore::new(JsonDirGameStore::open(&dir).unwrap());

    let mut host = Host::with_match_id("match_disk", ChessEngine::new(), Box::new(store.clone()));
    let a = ConnectionId(1);
    host.apply_event(HostEvent::Connected(a));
    host.apply_event(HostEvent::Message(
        a,
        ClientMessage::IdentityAnnounce {
            identity: ParticipantIdentity::new("A"),
        },
    ));
    host.apply_event(HostEvent::Message(
        a,
        ClientMessage::ProposeMove {
            from: "d2".to_string(),
            to: "d4".to_string(),
            promotion: None,
        },
    ));
    assert!(dir.join("match_disk_1.json").exists());

    let reopened = JsonDirGameStore::open(&dir).unwrap();
    let record = reopened.latest("match_disk").unwrap();

    let mut restored = Host::with_match_id(
        "match_restart",
        ChessEngine::new(),
        Box::new(SharedStore::new(MemoryGameStore::new())),
    );
    restored.apply_event(HostEvent::GameLoaded(a, Ok(record)));
    assert_eq!(restored.match_id(), "match_disk");
    assert_eq!(
        restored.coordinator().serialized_position(),
        host.coordinator().serialized_position()
    );
    assert_eq!(restored.arbiter().current(), Side::Black);

    std::fs::remove_dir_all(&dir).unwrap();
}
