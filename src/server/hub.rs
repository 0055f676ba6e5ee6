//! Shared hub: connection tracking, intent dispatch, and room timers.
//!
//! All room state is mutated while holding the hub lock, so handlers
//! for one room are serialized. Countdown ticks and animation pacing
//! run as spawned tasks that re-acquire the lock and re-check that the
//! battle they were armed for is still live before touching anything.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{ClientIntent, EventSender, ServerEvent};
use crate::config::AppConfig;
use crate::engine::{self, EngineError, Outcome, ResolutionStep};
use crate::models::{Battle, Cosmetics, Player, PlayerId, Zone};
use crate::presence;
use crate::registry::RoomRegistry;
use crate::tournament::{self, Advance, TournamentError};

/// Everything the dispatcher mutates, behind one lock.
pub struct Hub {
    pub registry: RoomRegistry,
    connections: HashMap<PlayerId, EventSender>,
    /// One countdown task per room, keyed by join code. Replaced when a
    /// new battle arms and aborted whenever its battle resolves.
    countdowns: HashMap<String, JoinHandle<()>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            registry: RoomRegistry::new(),
            connections: HashMap::new(),
            countdowns: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: PlayerId, sender: EventSender) {
        self.connections.insert(id, sender);
    }

    pub fn unregister(&mut self, id: &str) {
        self.connections.remove(id);
    }

    fn send_to(&self, id: &str, event: ServerEvent) {
        match self.connections.get(id) {
            Some(sender) => {
                let _ = sender.send(event);
            }
            None => debug!(conn = %id, "dropping event for unknown connection"),
        }
    }

    fn broadcast_to(&self, members: &[PlayerId], event: &ServerEvent) {
        for id in members {
            if let Some(sender) = self.connections.get(id) {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Live member ids of a room; empty when the room is gone.
    fn members(&self, room_key: &str) -> Vec<PlayerId> {
        self.registry
            .get(room_key)
            .map(|room| room.players.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn cancel_countdown(&mut self, room_key: &str) {
        if let Some(handle) = self.countdowns.remove(room_key) {
            handle.abort();
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle threaded through every handler and task.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Mutex<Hub>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            hub: Arc::new(Mutex::new(Hub::new())),
            config: Arc::new(config),
        }
    }
}

/// Dispatch one client intent.
pub async fn handle_intent(state: &AppState, conn: &str, intent: ClientIntent) {
    match intent {
        ClientIntent::CreateGame {
            player_name,
            cosmetics,
        } => create_game(state, conn, player_name, cosmetics).await,
        ClientIntent::IsCodeValid { join_code } => is_code_valid(state, conn, &join_code).await,
        ClientIntent::JoinRoom {
            player_name,
            cosmetics,
            join_code,
        } => join_room(state, conn, player_name, cosmetics, &join_code).await,
        ClientIntent::StartGame { room_key } => start_game(state, conn, &room_key).await,
        ClientIntent::SendReady {
            room_key,
            current_round,
            current_battle,
        } => send_ready(state, conn, &room_key, current_round, current_battle).await,
        ClientIntent::SendMoves {
            room_key,
            attack,
            defend,
        } => send_moves(state, conn, &room_key, attack, defend).await,
        ClientIntent::SendNext {
            room_key,
            current_round,
            current_battle,
        } => send_next(state, conn, &room_key, current_round, current_battle).await,
        ClientIntent::NeedUpdate { room_key } => need_update(state, conn, &room_key).await,
        ClientIntent::CheckMovesSent { room_key } => check_moves_sent(state, conn, &room_key).await,
        ClientIntent::CheckInputStatus { room_key } => {
            check_input_status(state, conn, &room_key).await
        }
    }
}

/// A connection dropped: pull the player from their room, tell the
/// survivors, and finish any handshake they were the last holdout on.
pub async fn handle_disconnect(state: &AppState, conn: &str) {
    let mut hub = state.hub.lock().await;
    hub.unregister(conn);

    let Some((room_key, remaining)) = hub.registry.remove_player(conn) else {
        return;
    };
    info!(conn = %conn, room = %room_key, remaining, "player left room");

    if remaining == 0 {
        hub.cancel_countdown(&room_key);
        hub.registry.remove_room(&room_key);
        return;
    }

    let members = hub.members(&room_key);
    if let Ok(room) = hub.registry.get(&room_key) {
        let event = ServerEvent::RoomUpdate {
            players: room.players.clone(),
        };
        hub.broadcast_to(&members, &event);
    }

    // The departed player may have been the last missing ack.
    let pending = hub
        .registry
        .get(&room_key)
        .map(|room| room.started && tournament::handshake_complete(room))
        .unwrap_or(false);
    if pending {
        advance_room(&mut hub, &room_key);
    }
}

async fn create_game(state: &AppState, conn: &str, player_name: String, cosmetics: Cosmetics) {
    let mut hub = state.hub.lock().await;
    let player = Player::new(conn, player_name, cosmetics);
    let room_key = hub.registry.create_room(player);
    info!(conn = %conn, room = %room_key, "room created");

    let players = hub
        .registry
        .get(&room_key)
        .map(|room| room.players.clone())
        .unwrap_or_default();
    hub.send_to(conn, ServerEvent::RoomCreated { room_key, players });
}

async fn is_code_valid(state: &AppState, conn: &str, join_code: &str) {
    let hub = state.hub.lock().await;
    let event = match hub.registry.validate_join(join_code) {
        Ok(()) => ServerEvent::CodeIsValid {
            join_code: join_code.to_string(),
        },
        Err(err) => ServerEvent::CodeNotValid {
            reason: err.reason().to_string(),
        },
    };
    hub.send_to(conn, event);
}

async fn join_room(
    state: &AppState,
    conn: &str,
    player_name: String,
    cosmetics: Cosmetics,
    join_code: &str,
) {
    let mut hub = state.hub.lock().await;
    let player = Player::new(conn, player_name, cosmetics);
    let players = match hub.registry.join_room(join_code, player) {
        Ok(room) => room.players.clone(),
        Err(err) => {
            debug!(conn = %conn, room = %join_code, %err, "join refused");
            hub.send_to(
                conn,
                ServerEvent::CodeNotValid {
                    reason: err.reason().to_string(),
                },
            );
            return;
        }
    };
    info!(conn = %conn, room = %join_code, count = players.len(), "player joined");

    hub.send_to(
        conn,
        ServerEvent::RoomJoined {
            room_key: join_code.to_string(),
            players: players.clone(),
        },
    );
    let others: Vec<PlayerId> = players.keys().filter(|id| *id != conn).cloned().collect();
    hub.broadcast_to(&others, &ServerEvent::RoomUpdate { players });
}

async fn start_game(state: &AppState, conn: &str, room_key: &str) {
    let mut hub = state.hub.lock().await;
    let room = match hub.registry.get_mut(room_key) {
        Ok(room) => room,
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "startGame for missing room");
            return;
        }
    };
    room.touch();
    if let Err(err) = tournament::start(room) {
        warn!(conn = %conn, room = %room_key, %err, "startGame refused");
        return;
    }
    info!(room = %room_key, players = room.player_count(), "tournament started");

    let snapshot = presence::snapshot(room);
    let members = hub.members(room_key);
    hub.broadcast_to(&members, &ServerEvent::GameUpdate { snapshot });
}

async fn send_ready(state: &AppState, conn: &str, room_key: &str, round: usize, slot: usize) {
    let mut hub = state.hub.lock().await;
    let room = match hub.registry.get_mut(room_key) {
        Ok(room) => room,
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "sendReady for missing room");
            return;
        }
    };
    room.touch();
    if room.current_round != round || room.current_battle != slot {
        debug!(conn = %conn, room = %room_key, "stale ready ignored");
        return;
    }
    if !room
        .current_battle()
        .is_some_and(|battle| battle.contains(conn))
    {
        warn!(conn = %conn, room = %room_key, "sendReady from non-occupant ignored");
        return;
    }
    match tournament::mark_ready(room) {
        Ok(true) => {}
        Ok(false) => return,
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "sendReady refused");
            return;
        }
    }

    let members = hub.members(room_key);
    hub.broadcast_to(&members, &ServerEvent::Ready);
    arm_countdown(&mut hub, state, room_key, round, slot);
}

async fn send_moves(state: &AppState, conn: &str, room_key: &str, attack: Zone, defend: Zone) {
    let mut hub = state.hub.lock().await;
    let room = match hub.registry.get_mut(room_key) {
        Ok(room) => room,
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "sendMoves for missing room");
            return;
        }
    };
    room.touch();
    let Some(battle) = room.current_battle_mut() else {
        warn!(conn = %conn, room = %room_key, "sendMoves with no live battle");
        return;
    };

    let outcome = engine::submit_move(battle, conn, attack, defend, &mut rand::thread_rng());
    match outcome {
        Err(err @ (EngineError::DuplicateMove(_) | EngineError::BattleAlreadyDecided)) => {
            debug!(conn = %conn, room = %room_key, %err, "move dropped");
        }
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "move rejected");
        }
        Ok(Outcome::Pending {
            player1_need_input,
            player2_need_input,
        }) => {
            let members = hub.members(room_key);
            hub.broadcast_to(
                &members,
                &ServerEvent::MoveUpdate {
                    player1_need_input,
                    player2_need_input,
                },
            );
        }
        Ok(Outcome::Resolved(steps)) => {
            broadcast_resolution(&mut hub, state, room_key, steps);
        }
    }
}

/// Broadcast the first resolution leg immediately, then pace the rest
/// (and the final reset frame) on a spawned task so the client can
/// animate each leg. Cancels the countdown the moment a winner exists.
fn broadcast_resolution(
    hub: &mut Hub,
    state: &AppState,
    room_key: &str,
    steps: Vec<ResolutionStep>,
) {
    let Some(last) = steps.last() else {
        return;
    };
    if last.battle.is_decided() {
        hub.cancel_countdown(room_key);
    }
    let final_state = last.battle.clone();

    let mut steps = steps.into_iter();
    if let Some(first) = steps.next() {
        let members = hub.members(room_key);
        hub.broadcast_to(
            &members,
            &ServerEvent::BattleUpdate {
                battle: first.battle,
                sequence: Some(first.sequence),
                reset: false,
            },
        );
    }

    let rest: Vec<ResolutionStep> = steps.collect();
    let state = state.clone();
    let room_key = room_key.to_string();
    let delay = Duration::from_millis(state.config.game.step_delay_ms);
    tokio::spawn(async move {
        for step in rest {
            tokio::time::sleep(delay).await;
            let hub = state.hub.lock().await;
            let members = hub.members(&room_key);
            hub.broadcast_to(
                &members,
                &ServerEvent::BattleUpdate {
                    battle: step.battle,
                    sequence: Some(step.sequence),
                    reset: false,
                },
            );
        }
        tokio::time::sleep(delay).await;
        let hub = state.hub.lock().await;
        let members = hub.members(&room_key);
        hub.broadcast_to(
            &members,
            &ServerEvent::BattleUpdate {
                battle: final_state,
                sequence: None,
                reset: true,
            },
        );
    });
}

async fn send_next(state: &AppState, conn: &str, room_key: &str, round: usize, slot: usize) {
    let mut hub = state.hub.lock().await;
    let room = match hub.registry.get_mut(room_key) {
        Ok(room) => room,
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "sendNext for missing room");
            return;
        }
    };
    if !room.players.contains_key(conn) {
        warn!(conn = %conn, room = %room_key, "sendNext from non-member ignored");
        return;
    }
    room.touch();
    if room.current_round != round || room.current_battle != slot {
        debug!(conn = %conn, room = %room_key, "stale ack ignored");
        return;
    }
    if tournament::record_ack(room, conn) {
        advance_room(&mut hub, room_key);
    }
}

/// Every member acknowledged: place the winner and either move to the
/// next battle or finish the tournament.
fn advance_room(hub: &mut Hub, room_key: &str) {
    let room = match hub.registry.get_mut(room_key) {
        Ok(room) => room,
        Err(_) => return,
    };
    let event = match tournament::advance(room) {
        Ok(Advance::Next { round, slot }) => {
            info!(room = %room_key, round, slot, "advancing to next battle");
            ServerEvent::Next {
                snapshot: presence::snapshot(room),
            }
        }
        Ok(Advance::Complete { champion }) => {
            info!(room = %room_key, champion = %champion.name, "tournament complete");
            ServerEvent::GameOver {
                rounds: presence::round_rows(room),
            }
        }
        Err(TournamentError::BattleUndecided) => {
            debug!(room = %room_key, "acks complete but battle still live");
            return;
        }
        Err(err) => {
            warn!(room = %room_key, %err, "advance failed");
            return;
        }
    };

    hub.cancel_countdown(room_key);
    let members = hub.members(room_key);
    hub.broadcast_to(&members, &event);
}

async fn need_update(state: &AppState, conn: &str, room_key: &str) {
    let mut hub = state.hub.lock().await;
    let snapshot = match hub.registry.get_mut(room_key) {
        Ok(room) => {
            room.touch();
            presence::snapshot(room)
        }
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "needUpdate for missing room");
            return;
        }
    };
    hub.send_to(conn, ServerEvent::GameUpdate { snapshot });
}

async fn check_moves_sent(state: &AppState, conn: &str, room_key: &str) {
    let hub = state.hub.lock().await;
    let sent = match hub.registry.get(room_key) {
        Ok(room) => presence::moves_sent(room, conn),
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "checkMovesSent for missing room");
            return;
        }
    };
    hub.send_to(conn, ServerEvent::MovesSent { sent });
}

async fn check_input_status(state: &AppState, conn: &str, room_key: &str) {
    let hub = state.hub.lock().await;
    let status = match hub.registry.get(room_key) {
        Ok(room) => presence::input_status(room, conn),
        Err(err) => {
            warn!(conn = %conn, room = %room_key, %err, "checkInputStatus for missing room");
            return;
        }
    };
    hub.send_to(conn, ServerEvent::InputStatus { status });
}

/// Arm the per-second countdown for the battle at `(round, slot)`.
/// Ticks stop on their own once the battle resolves or the room moves
/// on; expiry hands the battle to the tie-break.
fn arm_countdown(hub: &mut Hub, state: &AppState, room_key: &str, round: usize, slot: usize) {
    hub.cancel_countdown(room_key);

    let state = state.clone();
    let key = room_key.to_string();
    let start_delay = Duration::from_millis(state.config.game.start_delay_ms);
    let handle = tokio::spawn({
        let key = key.clone();
        async move {
            tokio::time::sleep(start_delay).await;
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let mut hub = state.hub.lock().await;
                let Ok(room) = hub.registry.get_mut(&key) else {
                    break;
                };
                if room.current_round != round || room.current_battle != slot {
                    break;
                }
                let Some(battle) = room.current_battle_mut() else {
                    break;
                };
                if battle.is_decided() {
                    break;
                }

                battle.time = battle.time.saturating_sub(1);
                let time = battle.time;
                let expired: Option<Battle> = if time == 0 && engine::resolve_timeout(battle) {
                    Some(battle.clone())
                } else {
                    None
                };

                let members = hub.members(&key);
                hub.broadcast_to(&members, &ServerEvent::TimeUpdate { time });
                if let Some(battle) = expired {
                    info!(room = %key, winner = %battle.winner.as_deref().unwrap_or(""), "battle resolved by timeout");
                    hub.broadcast_to(
                        &members,
                        &ServerEvent::BattleUpdate {
                            battle,
                            sequence: None,
                            reset: true,
                        },
                    );
                    break;
                }
            }
        }
    });
    hub.countdowns.insert(key, handle);
}

/// Periodic eviction of empty and idle rooms.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    let ttl = Duration::from_secs(state.config.game.room_ttl_secs);
    let every = Duration::from_secs(state.config.game.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let mut hub = state.hub.lock().await;
            let evicted = hub.registry.evict_idle(ttl);
            for code in &evicted {
                hub.cancel_countdown(code);
            }
            if !evicted.is_empty() {
                info!(count = evicted.len(), "evicted idle rooms");
            }
        }
    })
}
