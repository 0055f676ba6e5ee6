//! Bracket building and winner placement.
//!
//! First-round pairing is deterministic: roster entries sorted by player
//! id ascending, paired consecutively. Later rounds are materialized
//! lazily as winners are placed into them.

use std::collections::BTreeMap;

use crate::models::{Battle, Bracket, Player, PlayerId, Round};

/// Pair the roster into first-round battles. An odd roster leaves the
/// last battle's second slot empty, which fills it with a CPU opponent.
pub fn build_first_round(roster: &BTreeMap<PlayerId, Player>) -> Round {
    let mut battles = Vec::with_capacity(roster.len().div_ceil(2));
    let mut pending: Option<Player> = None;

    // BTreeMap iterates in id order, so pairing is reproducible for a
    // fixed roster.
    for player in roster.values() {
        match pending.take() {
            None => pending = Some(player.clone()),
            Some(first) => battles.push(Battle::new(first, Some(player.clone()))),
        }
    }
    if let Some(odd) = pending {
        battles.push(Battle::new(odd, None));
    }

    Round { battles }
}

/// Place a battle winner into the round after `current_round`.
///
/// Only applies when the current round has more than one battle; a
/// one-battle round is the final, and `false` signals the tournament is
/// over. The next round is created on demand; the winner goes into the
/// first battle with an open second slot, otherwise a new battle is
/// appended with the winner as player 1.
pub fn place_winner(bracket: &mut Bracket, current_round: usize, winner: Player) -> bool {
    let Some(round) = bracket.rounds.get(current_round) else {
        return false;
    };
    if round.battles.len() <= 1 {
        return false;
    }

    if bracket.rounds.len() <= current_round + 1 {
        bracket.rounds.push(Round::default());
    }

    let next = &mut bracket.rounds[current_round + 1];
    for battle in &mut next.battles {
        if battle.player2.is_none() {
            battle.fill_player2(winner);
            return true;
        }
    }
    next.battles.push(Battle::new(winner, None));
    true
}
