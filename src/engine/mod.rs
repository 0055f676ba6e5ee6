//! Battle engine: the per-battle exchange state machine.
//!
//! A battle cycles `AwaitingMoves -> ResolvingMoves -> (AwaitingMoves |
//! Decided)`. Each exchange collects one attack+defend submission per
//! side (defense is pre-committed against the opponent's next attack),
//! then resolves in up to two sequential legs so the client can animate
//! both. Against the CPU the second half is synthesized the moment the
//! human submits.
//!
//! Resolution is order-independent with respect to which side arrives
//! first: all pending state lives in `battle.moves`.

use rand::Rng;
use thiserror::Error;

use crate::models::{
    Battle, BattleSequence, Player, PlayerId, Zone, BLOCKED_DAMAGE, CPU_ID, FULL_DAMAGE,
};

/// Engine-level failures. Duplicates and stale submissions are expected
/// in normal operation and dropped by the dispatcher; the rest indicate
/// client/server desync and are logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("battle already decided")]
    BattleAlreadyDecided,

    #[error("duplicate move submission from {0}")]
    DuplicateMove(PlayerId),

    #[error("player {0} is not in this battle")]
    NotACombatant(PlayerId),

    #[error("attack and defend lanes must both be chosen")]
    MissingZone,

    #[error("pending exchange state is corrupt")]
    CorruptExchange,
}

/// One resolved leg of an exchange, paired with the battle state after
/// applying it. Broadcast as its own `battleUpdate` so both legs can be
/// animated before the settled state is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionStep {
    pub sequence: BattleSequence,
    pub battle: Battle,
}

/// What a move submission produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// First arrival stored; the exchange waits on the opponent.
    Pending {
        player1_need_input: bool,
        player2_need_input: bool,
    },
    /// Both halves arrived (or the CPU answered): one or two legs to
    /// broadcast with animation pacing.
    Resolved(Vec<ResolutionStep>),
}

/// Damage for one attack resolved against one declared block. A correct
/// lane guess by the defender blocks; everything else lands clean.
pub fn damage(attack: Zone, defend: Zone) -> i32 {
    if attack == defend {
        BLOCKED_DAMAGE
    } else {
        FULL_DAMAGE
    }
}

/// Uniform random lane for the CPU opponent.
fn random_zone(rng: &mut impl Rng) -> Zone {
    match rng.gen_range(1..=3) {
        1 => Zone::High,
        2 => Zone::Mid,
        _ => Zone::Low,
    }
}

/// Submit one side's attack for this exchange and block against the
/// next. See the module docs for the arrival protocol.
pub fn submit_move(
    battle: &mut Battle,
    submitter: &str,
    attack: Zone,
    defend: Zone,
    rng: &mut impl Rng,
) -> Result<Outcome, EngineError> {
    if battle.is_decided() {
        return Err(EngineError::BattleAlreadyDecided);
    }
    if attack.is_none() || defend.is_none() {
        return Err(EngineError::MissingZone);
    }
    if !battle.contains(submitter) {
        return Err(EngineError::NotACombatant(submitter.to_string()));
    }

    if battle.is_cpu_battle() {
        return Ok(Outcome::Resolved(resolve_cpu_exchange(
            battle, attack, defend, rng,
        )));
    }

    if battle.moves.is_empty() {
        return Ok(store_first_arrival(battle, submitter, attack, defend));
    }
    if battle.has_pending_move(submitter) {
        return Err(EngineError::DuplicateMove(submitter.to_string()));
    }
    resolve_second_arrival(battle, submitter, attack, defend).map(Outcome::Resolved)
}

/// Stash the first submission: the submitter's attack, plus a
/// placeholder carrying their defense on the opponent's entry.
fn store_first_arrival(battle: &mut Battle, submitter: &str, attack: Zone, defend: Zone) -> Outcome {
    let opponent = other_occupant(battle, submitter);
    battle.moves.push(BattleSequence {
        player_id: submitter.to_string(),
        attack,
        opponent_response: Zone::None,
    });
    battle.moves.push(BattleSequence {
        player_id: opponent,
        attack: Zone::None,
        opponent_response: defend,
    });

    Outcome::Pending {
        player1_need_input: battle.player1.player.id != submitter,
        player2_need_input: battle
            .player2
            .as_ref()
            .is_some_and(|p| p.player.id != submitter),
    }
}

/// Both sides are in: pop the pending pair and resolve two legs. Leg 1
/// is the first mover's stored attack against the defense supplied just
/// now; leg 2 runs only if the second mover survives.
fn resolve_second_arrival(
    battle: &mut Battle,
    submitter: &str,
    attack: Zone,
    defend: Zone,
) -> Result<Vec<ResolutionStep>, EngineError> {
    if battle.moves.len() != 2 {
        return Err(EngineError::CorruptExchange);
    }
    let first = battle.moves.remove(0);
    let placeholder = battle.moves.remove(0);
    if placeholder.player_id != submitter {
        return Err(EngineError::CorruptExchange);
    }

    let legs = [
        (first.player_id.clone(), first.attack, submitter.to_string(), defend),
        (
            submitter.to_string(),
            attack,
            first.player_id.clone(),
            placeholder.opponent_response,
        ),
    ];
    Ok(run_legs(battle, legs))
}

/// Human submits against the CPU: synthesize the CPU's half and resolve
/// human-then-CPU with no further interaction.
fn resolve_cpu_exchange(
    battle: &mut Battle,
    attack: Zone,
    defend: Zone,
    rng: &mut impl Rng,
) -> Vec<ResolutionStep> {
    let human = battle.player1.player.id.clone();
    let cpu_attack = random_zone(rng);
    let cpu_defend = random_zone(rng);

    let legs = [
        (human.clone(), attack, CPU_ID.to_string(), cpu_defend),
        (CPU_ID.to_string(), cpu_attack, human, defend),
    ];
    run_legs(battle, legs)
}

fn run_legs(battle: &mut Battle, legs: [(PlayerId, Zone, PlayerId, Zone); 2]) -> Vec<ResolutionStep> {
    let mut steps = Vec::with_capacity(2);
    for (attacker, attack, defender, response) in legs {
        if battle.is_decided() {
            break;
        }
        steps.push(apply_leg(battle, &attacker, attack, &defender, response));
    }
    steps
}

/// Apply one attack leg, concluding the battle if the defender drops to
/// zero, and snapshot the result.
fn apply_leg(
    battle: &mut Battle,
    attacker: &str,
    attack: Zone,
    defender: &str,
    response: Zone,
) -> ResolutionStep {
    let dealt = damage(attack, response);
    if let Some(health) = health_mut(battle, defender) {
        *health -= dealt;
        if *health <= 0 {
            conclude(battle, attacker, defender);
        }
    }

    ResolutionStep {
        sequence: BattleSequence {
            player_id: attacker.to_string(),
            attack,
            opponent_response: response,
        },
        battle: battle.clone(),
    }
}

/// Set the immutable winner string, freeze healths (loser clamped to
/// zero) and drop any pending moves.
fn conclude(battle: &mut Battle, winner: &str, loser: &str) {
    if battle.is_decided() {
        return;
    }
    battle.winner = Some(format!(
        "{} def. {}",
        occupant_name(battle, winner),
        occupant_name(battle, loser)
    ));
    clamp_healths(battle);
    battle.moves.clear();
}

/// Countdown expiry with no winner: strictly lower health loses; on a
/// tie the side that already committed a move this exchange wins, and
/// with no moves at all player 1 wins by default. The loser's health is
/// forced to zero. Returns whether this call resolved the battle.
pub fn resolve_timeout(battle: &mut Battle) -> bool {
    if battle.is_decided() {
        return false;
    }

    let p1 = battle.player1.player.id.clone();
    let p2 = battle
        .player2
        .as_ref()
        .map(|c| c.player.id.clone())
        .unwrap_or_else(|| CPU_ID.to_string());
    let p1_health = battle.player1.health;
    let p2_health = occupant_health(battle, &p2);

    let (winner, loser, by_default) = if p1_health > p2_health {
        (p1, p2, false)
    } else if p2_health > p1_health {
        (p2, p1, false)
    } else if battle.has_pending_move(&p1) {
        (p1, p2, false)
    } else if battle.has_pending_move(&p2) {
        (p2, p1, false)
    } else {
        (p1, p2, true)
    };

    battle.winner = Some(if by_default {
        format!("{} by default", occupant_name(battle, &winner))
    } else {
        format!(
            "{} def. {}",
            occupant_name(battle, &winner),
            occupant_name(battle, &loser)
        )
    });
    if let Some(health) = health_mut(battle, &loser) {
        *health = 0;
    }
    clamp_healths(battle);
    battle.moves.clear();
    true
}

/// The winning occupant of a decided battle, as a roster-level player
/// (the CPU maps to its synthetic identity). `None` while undecided.
pub fn victor(battle: &Battle) -> Option<Player> {
    if !battle.is_decided() {
        return None;
    }
    if battle.player1.health > 0 {
        return Some(battle.player1.player.clone());
    }
    match &battle.player2 {
        Some(p2) => Some(p2.player.clone()),
        None => Some(Player::cpu()),
    }
}

fn other_occupant(battle: &Battle, id: &str) -> PlayerId {
    if battle.player1.player.id == id {
        battle
            .player2
            .as_ref()
            .map(|p| p.player.id.clone())
            .unwrap_or_else(|| CPU_ID.to_string())
    } else {
        battle.player1.player.id.clone()
    }
}

fn occupant_name(battle: &Battle, id: &str) -> String {
    if battle.player1.player.id == id {
        return battle.player1.player.name.clone();
    }
    if let Some(p2) = &battle.player2 {
        if p2.player.id == id {
            return p2.player.name.clone();
        }
    }
    "CPU".to_string()
}

fn occupant_health(battle: &Battle, id: &str) -> i32 {
    if battle.player1.player.id == id {
        return battle.player1.health;
    }
    if let Some(p2) = &battle.player2 {
        if p2.player.id == id {
            return p2.health;
        }
    }
    battle.cpu_health.unwrap_or(0)
}

fn health_mut<'a>(battle: &'a mut Battle, id: &str) -> Option<&'a mut i32> {
    if battle.player1.player.id == id {
        return Some(&mut battle.player1.health);
    }
    if let Some(p2) = &mut battle.player2 {
        if p2.player.id == id {
            return Some(&mut p2.health);
        }
    }
    if id == CPU_ID {
        return battle.cpu_health.as_mut();
    }
    None
}

fn clamp_healths(battle: &mut Battle) {
    battle.player1.health = battle.player1.health.max(0);
    if let Some(p2) = &mut battle.player2 {
        p2.health = p2.health.max(0);
    }
    if let Some(cpu) = &mut battle.cpu_health {
        *cpu = (*cpu).max(0);
    }
}
