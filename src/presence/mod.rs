//! Resync snapshots and derived input status.
//!
//! Everything here is recomputable from room state alone, so a client
//! that missed live events (hidden tab, dropped frames) can ask for a
//! snapshot that always agrees with the event stream.

use serde::{Deserialize, Serialize};

use crate::models::{Battle, Room};

/// One bracket round rendered as display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRow {
    pub name: String,
    pub battles: Vec<String>,
}

/// Full room snapshot: the `gameUpdate` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub rounds: Vec<RoundRow>,
    pub battle: Option<Battle>,
    pub current_round: usize,
    pub current_battle: usize,
}

/// Per-seat display flags for the current battle, derived purely from
/// `battle.moves` and `battle.winner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputStatus {
    pub show_p1: bool,
    pub show_p2: bool,
    pub show_inputs_p1: bool,
    pub show_inputs_p2: bool,
}

impl InputStatus {
    const HIDDEN: Self = Self {
        show_p1: false,
        show_p2: false,
        show_inputs_p1: false,
        show_inputs_p2: false,
    };
}

/// Rebuild the full state a client needs to draw the room right now.
pub fn snapshot(room: &Room) -> GameSnapshot {
    GameSnapshot {
        rounds: round_rows(room),
        battle: room.current_battle().cloned(),
        current_round: room.current_round,
        current_battle: room.current_battle,
    }
}

/// Display rows for every round: decided battles show their recorded
/// winner string, others show the matchup with `???` for opponents not
/// yet determined and `CPU` for a known bye.
pub fn round_rows(room: &Room) -> Vec<RoundRow> {
    let Some(bracket) = &room.bracket else {
        return Vec::new();
    };
    bracket
        .rounds
        .iter()
        .enumerate()
        .map(|(index, round)| RoundRow {
            name: format!("Round {}", index + 1),
            battles: round
                .battles
                .iter()
                .map(|battle| battle_label(battle, index > room.current_round))
                .collect(),
        })
        .collect()
}

fn battle_label(battle: &Battle, future_round: bool) -> String {
    if let Some(winner) = &battle.winner {
        return winner.clone();
    }
    let p2 = match &battle.player2 {
        Some(p2) => p2.player.name.as_str(),
        // An open slot in a future round may still receive a winner; in
        // the current or a past round it is a bye.
        None if future_round => "???",
        None => "CPU",
    };
    format!("{} vs. {}", battle.player1.player.name, p2)
}

/// Whether `caller` has already locked in a move for the current
/// exchange. Used client-side to suppress duplicate input prompts
/// after a missed event.
pub fn moves_sent(room: &Room, caller: &str) -> bool {
    room.current_battle()
        .is_some_and(|battle| battle.has_pending_move(caller))
}

/// Seat indicators for the current battle. A seat "thinks" while it has
/// not submitted this exchange; the caller's own seat additionally
/// shows input controls.
pub fn input_status(room: &Room, caller: &str) -> InputStatus {
    let Some(battle) = room.current_battle() else {
        return InputStatus::HIDDEN;
    };
    if battle.is_decided() {
        return InputStatus::HIDDEN;
    }

    let show_p1 = !battle.has_pending_move(&battle.player1.player.id);
    let show_p2 = battle
        .player2
        .as_ref()
        .is_some_and(|p2| !battle.has_pending_move(&p2.player.id));
    let show_inputs_p1 = show_p1 && battle.player1.player.id == caller;
    let show_inputs_p2 = show_p2
        && battle
            .player2
            .as_ref()
            .is_some_and(|p2| p2.player.id == caller);

    InputStatus {
        show_p1,
        show_p2,
        show_inputs_p1,
        show_inputs_p2,
    }
}
