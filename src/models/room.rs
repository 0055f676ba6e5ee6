//! Room state: roster, bracket, and advancement bookkeeping.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use super::{Battle, Bracket, Player, PlayerId};

/// Maximum number of players in one room.
pub const ROOM_CAPACITY: usize = 32;

/// An isolated tournament instance identified by a join code.
///
/// The room exclusively owns its bracket and every battle in it. It is
/// not serialized wholesale; wire payloads are built from its pieces.
#[derive(Debug)]
pub struct Room {
    pub join_code: String,
    /// Roster keyed by player id. BTreeMap keeps iteration in id order,
    /// which first-round pairing relies on.
    pub players: BTreeMap<PlayerId, Player>,
    pub started: bool,
    pub bracket: Option<Bracket>,
    pub current_round: usize,
    pub current_battle: usize,
    pub final_winner: Option<Player>,
    /// Distinct connections that acknowledged the current battle result.
    pub next_acks: HashSet<PlayerId>,
    /// Last intent touching this room; drives idle eviction.
    pub last_activity: Instant,
}

impl Room {
    pub fn new(join_code: String, creator: Player) -> Self {
        let mut players = BTreeMap::new();
        players.insert(creator.id.clone(), creator);
        Self {
            join_code,
            players,
            started: false,
            bracket: None,
            current_round: 0,
            current_battle: 0,
            final_winner: None,
            next_acks: HashSet::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// The battle the room is currently on, if the tournament is live.
    pub fn current_battle(&self) -> Option<&Battle> {
        self.bracket
            .as_ref()?
            .battle_at(self.current_round, self.current_battle)
    }

    pub fn current_battle_mut(&mut self) -> Option<&mut Battle> {
        let (round, slot) = (self.current_round, self.current_battle);
        self.bracket.as_mut()?.battle_at_mut(round, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cosmetics;

    #[test]
    fn test_new_room_has_creator_only() {
        let creator = Player::new("a", "Alice", Cosmetics::default());
        let room = Room::new("AB2CD".to_string(), creator);
        assert_eq!(room.player_count(), 1);
        assert!(!room.started);
        assert!(room.bracket.is_none());
        assert!(room.current_battle().is_none());
    }
}
