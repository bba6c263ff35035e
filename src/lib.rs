//! Authoritative chess host.
//!
//! One process owns the canonical position and the turn. Participants
//! propose moves; the host validates them against the rules, applies each
//! accepted move exactly once, hands the turn over, and tells everybody.
//! Rejected proposals go back to their proposer only.

pub mod client;
pub mod config;
pub mod error;
pub mod game;
pub mod host;
pub mod models;
pub mod persistence;
pub mod routes;
pub mod websocket;

pub use host::{Host, HostEvent, StorageRequest};
