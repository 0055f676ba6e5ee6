//! Wire protocol: client intents and server events.
//!
//! The transport is a plain bidirectional event channel; every payload
//! is a tagged JSON object. The dispatcher in `server::hub` consumes
//! intents and pushes events into per-connection senders, so tests can
//! drive the whole protocol without a socket.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{Battle, BattleSequence, Cosmetics, Player, PlayerId, Zone};
use crate::presence::{GameSnapshot, InputStatus, RoundRow};

/// Outbound half of one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Roster payload as broadcast to clients.
pub type Roster = BTreeMap<PlayerId, Player>;

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientIntent {
    #[serde(rename_all = "camelCase")]
    CreateGame {
        player_name: String,
        #[serde(flatten)]
        cosmetics: Cosmetics,
    },
    #[serde(rename_all = "camelCase")]
    IsCodeValid { join_code: String },
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        player_name: String,
        #[serde(flatten)]
        cosmetics: Cosmetics,
        join_code: String,
    },
    #[serde(rename_all = "camelCase")]
    StartGame { room_key: String },
    #[serde(rename_all = "camelCase")]
    SendReady {
        room_key: String,
        current_round: usize,
        current_battle: usize,
    },
    #[serde(rename_all = "camelCase")]
    SendMoves {
        room_key: String,
        attack: Zone,
        defend: Zone,
    },
    #[serde(rename_all = "camelCase")]
    SendNext {
        room_key: String,
        current_round: usize,
        current_battle: usize,
    },
    #[serde(rename_all = "camelCase")]
    NeedUpdate { room_key: String },
    #[serde(rename_all = "camelCase")]
    CheckMovesSent { room_key: String },
    #[serde(rename_all = "camelCase")]
    CheckInputStatus { room_key: String },
}

/// Everything the server can tell a client. Broadcast to the room
/// unless the dispatcher sends it unicast (resync and request/response
/// replies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_key: String, players: Roster },
    #[serde(rename_all = "camelCase")]
    CodeIsValid { join_code: String },
    #[serde(rename_all = "camelCase")]
    CodeNotValid { reason: String },
    #[serde(rename_all = "camelCase")]
    RoomJoined { room_key: String, players: Roster },
    #[serde(rename_all = "camelCase")]
    RoomUpdate { players: Roster },
    GameUpdate {
        #[serde(flatten)]
        snapshot: GameSnapshot,
    },
    Ready,
    #[serde(rename_all = "camelCase")]
    TimeUpdate { time: u32 },
    #[serde(rename_all = "camelCase")]
    MoveUpdate {
        player1_need_input: bool,
        player2_need_input: bool,
    },
    #[serde(rename_all = "camelCase")]
    BattleUpdate {
        battle: Battle,
        sequence: Option<BattleSequence>,
        reset: bool,
    },
    Next {
        #[serde(flatten)]
        snapshot: GameSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    GameOver { rounds: Vec<RoundRow> },
    #[serde(rename_all = "camelCase")]
    MovesSent { sent: bool },
    InputStatus {
        #[serde(flatten)]
        status: InputStatus,
    },
}
