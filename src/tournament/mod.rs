//! Tournament controller: room phase and bracket advancement.
//!
//! A room moves `Lobby -> InProgress -> Complete`. Battles run one at a
//! time in bracket order; after each result every live connection must
//! acknowledge before the room advances.

use thiserror::Error;

use crate::bracket;
use crate::engine;
use crate::models::{Bracket, Player, Room};

/// Room lifecycle phase, derived from room state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    InProgress,
    Complete,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TournamentError {
    #[error("tournament already started")]
    AlreadyStarted,

    #[error("tournament has not started")]
    NotStarted,

    #[error("no battle at round {round} slot {slot}")]
    NoSuchBattle { round: usize, slot: usize },

    #[error("current battle is not decided yet")]
    BattleUndecided,
}

/// What advancement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved on to the next battle slot.
    Next { round: usize, slot: usize },
    /// The decided battle was the final; the bracket is complete.
    Complete { champion: Player },
}

pub fn phase(room: &Room) -> Phase {
    if room.final_winner.is_some() {
        Phase::Complete
    } else if room.started {
        Phase::InProgress
    } else {
        Phase::Lobby
    }
}

/// Start the tournament: build round 1 from the roster and point the
/// room at its first battle.
pub fn start(room: &mut Room) -> Result<(), TournamentError> {
    if room.started {
        return Err(TournamentError::AlreadyStarted);
    }
    let first_round = bracket::build_first_round(&room.players);
    room.bracket = Some(Bracket {
        rounds: vec![first_round],
    });
    room.current_round = 0;
    room.current_battle = 0;
    room.started = true;
    Ok(())
}

/// Readiness gate: the first ready for the current battle arms the
/// countdown. Returns `true` only on that first call.
pub fn mark_ready(room: &mut Room) -> Result<bool, TournamentError> {
    if !room.started {
        return Err(TournamentError::NotStarted);
    }
    let (round, slot) = (room.current_round, room.current_battle);
    let battle = room
        .current_battle_mut()
        .ok_or(TournamentError::NoSuchBattle { round, slot })?;
    if battle.ready {
        return Ok(false);
    }
    battle.ready = true;
    Ok(true)
}

/// Record one "seen the result" acknowledgement. Only roster members
/// count toward the handshake; duplicate acks from the same connection
/// are absorbed by set semantics. Returns `true` once every live room
/// member has acknowledged.
pub fn record_ack(room: &mut Room, player_id: &str) -> bool {
    if !room.players.contains_key(player_id) {
        return false;
    }
    room.next_acks.insert(player_id.to_string());
    handshake_complete(room)
}

pub fn handshake_complete(room: &Room) -> bool {
    !room.players.is_empty() && room.next_acks.len() >= room.player_count()
}

/// Advance past the decided current battle: place its winner into the
/// next round, or finish the tournament if this was the final.
pub fn advance(room: &mut Room) -> Result<Advance, TournamentError> {
    if !room.started {
        return Err(TournamentError::NotStarted);
    }
    let (round, slot) = (room.current_round, room.current_battle);
    let battle = room
        .current_battle()
        .ok_or(TournamentError::NoSuchBattle { round, slot })?;
    let winner = engine::victor(battle).ok_or(TournamentError::BattleUndecided)?;

    let bracket = room
        .bracket
        .as_mut()
        .ok_or(TournamentError::NotStarted)?;
    let placed = bracket::place_winner(bracket, round, winner.clone());
    let round_len = bracket.rounds[round].battles.len();
    room.next_acks.clear();

    if !placed {
        room.final_winner = Some(winner.clone());
        return Ok(Advance::Complete { champion: winner });
    }

    if slot + 1 < round_len {
        room.current_battle = slot + 1;
    } else {
        room.current_round = round + 1;
        room.current_battle = 0;
    }
    Ok(Advance::Next {
        round: room.current_round,
        slot: room.current_battle,
    })
}
