//! End-to-end tournament flows driven through the intent dispatcher,
//! with per-connection channels standing in for the WebSocket layer.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use kumite::bus::{ClientIntent, ServerEvent};
use kumite::config::AppConfig;
use kumite::models::{Cosmetics, Zone};
use kumite::presence::GameSnapshot;
use kumite::server::{handle_intent, AppState};

fn test_state() -> AppState {
    let mut config = AppConfig::default();
    // No animation pacing or countdown lead-in in tests.
    config.game.start_delay_ms = 0;
    config.game.step_delay_ms = 0;
    AppState::new(config)
}

async fn connect(state: &AppState, id: &str) -> mpsc::UnboundedReceiver<ServerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    state.hub.lock().await.register(id.to_string(), tx);
    rx
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Give spawned pacing tasks a chance to run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

async fn create_game(state: &AppState, conn: &str, name: &str) {
    handle_intent(
        state,
        conn,
        ClientIntent::CreateGame {
            player_name: name.to_string(),
            cosmetics: Cosmetics::default(),
        },
    )
    .await;
}

async fn join_room(state: &AppState, conn: &str, name: &str, join_code: &str) {
    handle_intent(
        state,
        conn,
        ClientIntent::JoinRoom {
            player_name: name.to_string(),
            cosmetics: Cosmetics::default(),
            join_code: join_code.to_string(),
        },
    )
    .await;
}

async fn send_moves(state: &AppState, conn: &str, room_key: &str, attack: Zone, defend: Zone) {
    handle_intent(
        state,
        conn,
        ClientIntent::SendMoves {
            room_key: room_key.to_string(),
            attack,
            defend,
        },
    )
    .await;
}

fn room_key_of(events: &[ServerEvent]) -> String {
    events
        .iter()
        .find_map(|event| match event {
            ServerEvent::RoomCreated { room_key, .. } => Some(room_key.clone()),
            _ => None,
        })
        .expect("roomCreated event")
}

/// Fetch a fresh snapshot via the resync path.
async fn snapshot_via_resync(
    state: &AppState,
    conn: &str,
    rx: &mut mpsc::UnboundedReceiver<ServerEvent>,
    room_key: &str,
) -> GameSnapshot {
    drain(rx);
    handle_intent(
        state,
        conn,
        ClientIntent::NeedUpdate {
            room_key: room_key.to_string(),
        },
    )
    .await;
    drain(rx)
        .into_iter()
        .find_map(|event| match event {
            ServerEvent::GameUpdate { snapshot } => Some(snapshot),
            _ => None,
        })
        .expect("gameUpdate event")
}

#[tokio::test]
async fn test_create_validate_join_start() {
    let state = test_state();
    let mut rx_a = connect(&state, "a").await;
    let mut rx_b = connect(&state, "b").await;

    create_game(&state, "a", "Alice").await;
    let events = drain(&mut rx_a);
    let room_key = room_key_of(&events);
    assert!(matches!(
        &events[0],
        ServerEvent::RoomCreated { players, .. } if players.len() == 1
    ));

    handle_intent(
        &state,
        "b",
        ClientIntent::IsCodeValid {
            join_code: room_key.clone(),
        },
    )
    .await;
    assert_eq!(
        drain(&mut rx_b),
        vec![ServerEvent::CodeIsValid {
            join_code: room_key.clone()
        }]
    );

    join_room(&state, "b", "Bob", &room_key).await;
    let events = drain(&mut rx_b);
    assert!(matches!(
        &events[0],
        ServerEvent::RoomJoined { players, .. } if players.len() == 2
    ));
    let events = drain(&mut rx_a);
    assert!(matches!(
        &events[0],
        ServerEvent::RoomUpdate { players } if players.len() == 2
    ));

    handle_intent(
        &state,
        "a",
        ClientIntent::StartGame {
            room_key: room_key.clone(),
        },
    )
    .await;
    for rx in [&mut rx_a, &mut rx_b] {
        let events = drain(rx);
        let Some(ServerEvent::GameUpdate { snapshot }) = events.first() else {
            panic!("expected gameUpdate, got {events:?}");
        };
        assert_eq!(snapshot.rounds.len(), 1);
        assert_eq!(snapshot.rounds[0].battles, vec!["Alice vs. Bob".to_string()]);
        let battle = snapshot.battle.as_ref().unwrap();
        assert_eq!(battle.player1.player.id, "a");
        assert_eq!(battle.player2.as_ref().unwrap().player.id, "b");
    }
}

#[tokio::test]
async fn test_solo_room_fights_cpu() {
    let state = test_state();
    let mut rx = connect(&state, "a").await;

    create_game(&state, "a", "Alice").await;
    let room_key = room_key_of(&drain(&mut rx));
    handle_intent(
        &state,
        "a",
        ClientIntent::StartGame {
            room_key: room_key.clone(),
        },
    )
    .await;

    let events = drain(&mut rx);
    let Some(ServerEvent::GameUpdate { snapshot }) = events.first() else {
        panic!("expected gameUpdate, got {events:?}");
    };
    let battle = snapshot.battle.as_ref().unwrap();
    assert!(battle.player2.is_none());
    assert_eq!(battle.cpu_health, Some(100));
    assert_eq!(snapshot.rounds[0].battles, vec!["Alice vs. CPU".to_string()]);
}

#[tokio::test]
async fn test_exchange_resolution_and_pacing() {
    let state = test_state();
    let mut rx_a = connect(&state, "a").await;
    let mut rx_b = connect(&state, "b").await;

    create_game(&state, "a", "Alice").await;
    let room_key = room_key_of(&drain(&mut rx_a));
    join_room(&state, "b", "Bob", &room_key).await;
    handle_intent(
        &state,
        "a",
        ClientIntent::StartGame {
            room_key: room_key.clone(),
        },
    )
    .await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    // First arrival: Alice leads High, pre-committing a Low block.
    send_moves(&state, "a", &room_key, Zone::High, Zone::Low).await;
    let events = drain(&mut rx_b);
    assert_eq!(
        events,
        vec![ServerEvent::MoveUpdate {
            player1_need_input: false,
            player2_need_input: true,
        }]
    );

    // The caller can confirm its lock-in through the resync path.
    handle_intent(
        &state,
        "a",
        ClientIntent::CheckMovesSent {
            room_key: room_key.clone(),
        },
    )
    .await;
    assert_eq!(
        drain(&mut rx_a).last(),
        Some(&ServerEvent::MovesSent { sent: true })
    );

    // Second arrival: Bob blocks High and answers Mid.
    send_moves(&state, "b", &room_key, Zone::Mid, Zone::High).await;
    settle().await;

    let updates: Vec<ServerEvent> = drain(&mut rx_b)
        .into_iter()
        .filter(|e| matches!(e, ServerEvent::BattleUpdate { .. }))
        .collect();
    assert_eq!(updates.len(), 3, "two legs plus the reset frame");

    // Leg 1: High into a High block, 30 damage.
    let ServerEvent::BattleUpdate {
        battle, sequence, reset,
    } = &updates[0]
    else {
        unreachable!()
    };
    assert!(!reset);
    let sequence = sequence.as_ref().unwrap();
    assert_eq!(sequence.player_id, "a");
    assert_eq!(sequence.attack, Zone::High);
    assert_eq!(sequence.opponent_response, Zone::High);
    assert_eq!(battle.player2.as_ref().unwrap().health, 70);
    assert_eq!(battle.player1.health, 100);

    // Leg 2: Mid into Alice's pre-committed Low block, 60 damage.
    let ServerEvent::BattleUpdate { battle, sequence, .. } = &updates[1] else {
        unreachable!()
    };
    let sequence = sequence.as_ref().unwrap();
    assert_eq!(sequence.player_id, "b");
    assert_eq!(sequence.opponent_response, Zone::Low);
    assert_eq!(battle.player1.health, 40);

    // Reset frame carries the settled state, still undecided.
    let ServerEvent::BattleUpdate { battle, sequence, reset } = &updates[2] else {
        unreachable!()
    };
    assert!(reset);
    assert!(sequence.is_none());
    assert!(battle.winner.is_none());
    assert!(battle.moves.is_empty());
}

#[tokio::test]
async fn test_next_handshake_gates_advancement() {
    let state = test_state();
    let mut rx_a = connect(&state, "a").await;
    let mut rx_b = connect(&state, "b").await;

    create_game(&state, "a", "Alice").await;
    let room_key = room_key_of(&drain(&mut rx_a));
    join_room(&state, "b", "Bob", &room_key).await;
    handle_intent(
        &state,
        "a",
        ClientIntent::StartGame {
            room_key: room_key.clone(),
        },
    )
    .await;

    // Two clean exchanges knock Bob out: 60 + 60 through wrong blocks.
    for _ in 0..2 {
        send_moves(&state, "a", &room_key, Zone::High, Zone::Mid).await;
        send_moves(&state, "b", &room_key, Zone::Low, Zone::Low).await;
        settle().await;
    }
    let decided = drain(&mut rx_a).iter().any(|e| {
        matches!(e, ServerEvent::BattleUpdate { battle, .. } if battle.winner.is_some())
    });
    assert!(decided, "battle should be decided after two exchanges");
    drain(&mut rx_b);

    // One ack is not enough.
    handle_intent(
        &state,
        "a",
        ClientIntent::SendNext {
            room_key: room_key.clone(),
            current_round: 0,
            current_battle: 0,
        },
    )
    .await;
    assert!(drain(&mut rx_a).is_empty());

    // A duplicate ack from the same connection changes nothing.
    handle_intent(
        &state,
        "a",
        ClientIntent::SendNext {
            room_key: room_key.clone(),
            current_round: 0,
            current_battle: 0,
        },
    )
    .await;
    assert!(drain(&mut rx_a).is_empty());

    // The second member's ack completes the handshake; this was the
    // final battle, so the room finishes.
    handle_intent(
        &state,
        "b",
        ClientIntent::SendNext {
            room_key: room_key.clone(),
            current_round: 0,
            current_battle: 0,
        },
    )
    .await;
    let events = drain(&mut rx_a);
    let Some(ServerEvent::GameOver { rounds }) = events.first() else {
        panic!("expected gameOver, got {events:?}");
    };
    assert_eq!(rounds[0].battles, vec!["Alice def. Bob".to_string()]);
}

#[tokio::test]
async fn test_eight_player_bracket_to_champion() {
    let state = test_state();
    let ids = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let names = ["P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8"];

    let mut receivers = Vec::new();
    for id in ids {
        receivers.push(connect(&state, id).await);
    }
    create_game(&state, "a", "P1").await;
    let room_key = room_key_of(&drain(&mut receivers[0]));
    for (id, name) in ids.iter().zip(names.iter()).skip(1) {
        join_room(&state, id, name, &room_key).await;
    }
    handle_intent(
        &state,
        "a",
        ClientIntent::StartGame {
            room_key: room_key.clone(),
        },
    )
    .await;

    let mut game_over = None;
    for _ in 0..8 {
        let snapshot = snapshot_via_resync(&state, "a", &mut receivers[0], &room_key).await;
        let battle = snapshot.battle.expect("live battle");
        let p1 = battle.player1.player.id.clone();
        let p2 = battle.player2.as_ref().map(|c| c.player.id.clone());

        // Player 1 swings clean hits until the battle is decided; with
        // these fixed lanes every battle ends inside two exchanges.
        for _ in 0..2 {
            send_moves(&state, &p1, &room_key, Zone::High, Zone::Mid).await;
            if let Some(p2) = &p2 {
                send_moves(&state, p2, &room_key, Zone::Low, Zone::Low).await;
            }
            settle().await;
        }

        for id in ids {
            handle_intent(
                &state,
                id,
                ClientIntent::SendNext {
                    room_key: room_key.clone(),
                    current_round: snapshot.current_round,
                    current_battle: snapshot.current_battle,
                },
            )
            .await;
        }
        let events = drain(&mut receivers[0]);
        if let Some(ServerEvent::GameOver { rounds }) = events
            .iter()
            .find(|e| matches!(e, ServerEvent::GameOver { .. }))
        {
            game_over = Some(rounds.clone());
            break;
        }
        assert!(
            events.iter().any(|e| matches!(e, ServerEvent::Next { .. })),
            "expected advancement, got {events:?}"
        );
    }

    let rounds = game_over.expect("tournament should complete");
    assert_eq!(rounds.len(), 3);
    assert_eq!(rounds[2].battles.len(), 1);
    // Every recorded battle has a decisive winner string.
    for row in &rounds {
        for result in &row.battles {
            assert!(result.contains(" def. "), "unresolved battle: {result}");
        }
    }
}
