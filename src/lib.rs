//! # Kumite
//!
//! A real-time single-elimination fighting tournament server. Players
//! join a room by a short code, are paired into a bracket (byes filled
//! by a CPU opponent), and fight turn-based attack/block battles until
//! one champion remains.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, battles, brackets, rooms)
//! - **registry**: Room creation, join codes, roster, eviction
//! - **bracket**: First-round pairing and winner placement
//! - **engine**: The per-battle exchange resolution state machine
//! - **tournament**: Room phase and bracket advancement
//! - **presence**: Resync snapshots and derived input status
//! - **bus**: Wire-level intents and events
//! - **server**: Hub dispatch, timers, and the WebSocket binding
//! - **config**: Configuration loading and validation

pub mod bracket;
pub mod bus;
pub mod config;
pub mod engine;
pub mod models;
pub mod presence;
pub mod registry;
pub mod server;
pub mod tournament;

pub use models::*;
