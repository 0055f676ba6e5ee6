//! Room registry: join-code generation, roster management, eviction.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::models::{Player, Room, ROOM_CAPACITY};

/// Join-code alphabet. I and O are left out as ambiguous glyphs.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ0123456789";

/// Join codes are exactly five characters.
pub const JOIN_CODE_LEN: usize = 5;

/// Why a join was refused. `reason()` gives the wire-level string sent
/// in `codeNotValid`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no room with code {0}")]
    NoSuchCode(String),

    #[error("room {0} is full")]
    RoomFull(String),

    #[error("room {0} has already started")]
    InProgress(String),
}

impl RegistryError {
    pub fn reason(&self) -> &'static str {
        match self {
            RegistryError::NoSuchCode(_) => "no-such-code",
            RegistryError::RoomFull(_) => "room-full",
            RegistryError::InProgress(_) => "in-progress",
        }
    }
}

/// Generate one candidate join code.
pub fn generate_join_code(rng: &mut impl Rng) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Owns every active room. Lives inside the server's shared hub rather
/// than as a process-wide global, so it can be torn down and tested.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with the caller as sole member and return its
    /// join code. Codes are regenerated until unique among live rooms.
    pub fn create_room(&mut self, creator: Player) -> String {
        let mut rng = rand::thread_rng();
        let mut code = generate_join_code(&mut rng);
        while self.rooms.contains_key(&code) {
            code = generate_join_code(&mut rng);
        }
        self.rooms
            .insert(code.clone(), Room::new(code.clone(), creator));
        code
    }

    pub fn get(&self, code: &str) -> Result<&Room, RegistryError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RegistryError::NoSuchCode(code.to_string()))
    }

    pub fn get_mut(&mut self, code: &str) -> Result<&mut Room, RegistryError> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| RegistryError::NoSuchCode(code.to_string()))
    }

    /// A room is joinable iff it exists, has space, and has not started.
    pub fn validate_join(&self, code: &str) -> Result<(), RegistryError> {
        let room = self.get(code)?;
        if room.player_count() >= ROOM_CAPACITY {
            return Err(RegistryError::RoomFull(code.to_string()));
        }
        if room.started {
            return Err(RegistryError::InProgress(code.to_string()));
        }
        Ok(())
    }

    /// Add a player to a room's roster. Unlike the silent no-op this
    /// replaces, a missing room is an explicit error.
    pub fn join_room(&mut self, code: &str, player: Player) -> Result<&Room, RegistryError> {
        self.validate_join(code)?;
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RegistryError::NoSuchCode(code.to_string()))?;
        room.players.insert(player.id.clone(), player);
        room.touch();
        Ok(room)
    }

    /// Remove a player from whichever room holds them. Idempotent:
    /// returns the room code and remaining count when the roster
    /// changed, `None` when the player was not in any room.
    pub fn remove_player(&mut self, player_id: &str) -> Option<(String, usize)> {
        let code = self
            .rooms
            .values()
            .find(|room| room.players.contains_key(player_id))?
            .join_code
            .clone();
        let room = self.rooms.get_mut(&code)?;
        room.players.remove(player_id);
        room.next_acks.remove(player_id);
        room.touch();
        Some((code, room.player_count()))
    }

    /// Drop a room outright (e.g. when its last member disconnects).
    pub fn remove_room(&mut self, code: &str) -> Option<Room> {
        self.rooms.remove(code)
    }

    /// Drop rooms that are empty or idle beyond `ttl`. Returns the
    /// evicted codes so the caller can cancel their timers.
    pub fn evict_idle(&mut self, ttl: Duration) -> Vec<String> {
        let evicted: Vec<String> = self
            .rooms
            .values()
            .filter(|room| room.players.is_empty() || room.last_activity.elapsed() >= ttl)
            .map(|room| room.join_code.clone())
            .collect();
        for code in &evicted {
            self.rooms.remove(code);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
