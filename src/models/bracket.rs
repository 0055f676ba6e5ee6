//! Bracket structure: rounds of battles.

use serde::{Deserialize, Serialize};

use super::Battle;

/// One round of the single-elimination bracket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub battles: Vec<Battle>,
}

/// The whole bracket. Round 1 is built from the roster at tournament
/// start; later rounds are materialized lazily as winners are placed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub rounds: Vec<Round>,
}

impl Bracket {
    pub fn battle_at(&self, round: usize, slot: usize) -> Option<&Battle> {
        self.rounds.get(round)?.battles.get(slot)
    }

    pub fn battle_at_mut(&mut self, round: usize, slot: usize) -> Option<&mut Battle> {
        self.rounds.get_mut(round)?.battles.get_mut(slot)
    }
}
