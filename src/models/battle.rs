//! Battle state: combatants, pending moves, resolved exchanges.

use serde::{Deserialize, Serialize};

use super::{Player, PlayerId};

/// Health every combatant (and the CPU) starts a battle with.
pub const STARTING_HEALTH: i32 = 100;

/// Countdown length for one battle, in seconds.
pub const BATTLE_TIME_SECS: u32 = 60;

/// Damage dealt when the defender guessed the attack lane.
pub const BLOCKED_DAMAGE: i32 = 30;

/// Damage dealt when the defender blocked the wrong lane.
pub const FULL_DAMAGE: i32 = 60;

/// Attack or block lane. `None` marks the unfilled half of a pending
/// exchange and never survives to resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    None,
    High,
    Mid,
    Low,
}

impl Zone {
    pub fn is_none(self) -> bool {
        matches!(self, Zone::None)
    }
}

/// One player's declared attack together with the block the opponent
/// used against it. Ephemeral: stored while an exchange is pending,
/// consumed when it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSequence {
    pub player_id: PlayerId,
    pub attack: Zone,
    pub opponent_response: Zone,
}

/// A player plus battle health. Health may go negative mid-resolution;
/// it is clamped to zero when the battle concludes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    #[serde(flatten)]
    pub player: Player,
    pub health: i32,
}

impl Combatant {
    pub fn new(player: Player) -> Self {
        Self {
            player,
            health: STARTING_HEALTH,
        }
    }
}

/// One matchup. `player2` is `None` exactly when the slot is filled by
/// the CPU (a first-round bye, or an odd winner in a later round whose
/// opponent slot was never filled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub player1: Combatant,
    pub player2: Option<Combatant>,
    pub cpu_health: Option<i32>,
    pub time: u32,
    pub moves: Vec<BattleSequence>,
    /// Descriptive result, e.g. `"Alice def. Bob"`. Set at most once;
    /// immutable afterwards.
    pub winner: Option<String>,
    pub ready: bool,
}

impl Battle {
    /// A battle with one or both occupants. A missing second occupant
    /// gets a CPU health pool.
    pub fn new(player1: Player, player2: Option<Player>) -> Self {
        let cpu_health = if player2.is_none() {
            Some(STARTING_HEALTH)
        } else {
            None
        };
        Self {
            player1: Combatant::new(player1),
            player2: player2.map(Combatant::new),
            cpu_health,
            time: BATTLE_TIME_SECS,
            moves: Vec::new(),
            winner: None,
            ready: false,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }

    pub fn is_cpu_battle(&self) -> bool {
        self.player2.is_none()
    }

    /// Fill the open second slot with an advancing winner.
    pub fn fill_player2(&mut self, player: Player) {
        self.player2 = Some(Combatant::new(player));
        self.cpu_health = None;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.player1.player.id == id
            || self
                .player2
                .as_ref()
                .is_some_and(|p| p.player.id == id)
    }

    /// Whether `id` has already locked in a move for the current
    /// exchange. Pending state is fully described by `moves[0]`.
    pub fn has_pending_move(&self, id: &str) -> bool {
        self.moves.first().is_some_and(|m| m.player_id == id)
    }
}
