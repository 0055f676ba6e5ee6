use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kumite::config::AppConfig;
use kumite::models::{Cosmetics, Player, Room, Zone};
use kumite::server::{build_router, spawn_sweeper, AppState};
use kumite::tournament::{self, Advance};
use kumite::{engine, presence};

#[derive(Parser)]
#[command(name = "kumite")]
#[command(about = "Real-time single-elimination fighting tournament server")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run an offline tournament with random moves and print the bracket
    Simulate {
        /// Number of fighters
        #[arg(long, default_value = "8")]
        players: usize,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting kumite v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { host, port } => {
            let config_path = std::path::PathBuf::from(&cli.config);
            let mut config = if config_path.exists() {
                AppConfig::from_file(&config_path)?
            } else {
                tracing::info!("No config file at {}, using defaults", cli.config);
                AppConfig::default()
            };
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let state = AppState::new(config);
            spawn_sweeper(state.clone());
            let app = build_router(state);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Game server: ws://{}/ws", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Simulate { players, seed } => {
            if players == 0 {
                eprintln!("Need at least one fighter");
                return Ok(());
            }
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            simulate(players, &mut rng)?;
        }
    }

    Ok(())
}

/// Play a whole tournament locally with uniformly random moves.
fn simulate(players: usize, rng: &mut StdRng) -> Result<()> {
    let creator = Player::new("p000", "Fighter 1", Cosmetics::default());
    let mut room = Room::new("LOCAL".to_string(), creator);
    for i in 1..players {
        let id = format!("p{i:03}");
        room.players.insert(
            id.clone(),
            Player::new(id, format!("Fighter {}", i + 1), Cosmetics::default()),
        );
    }
    tournament::start(&mut room)?;

    loop {
        let Some(battle) = room.current_battle() else {
            anyhow::bail!("bracket advanced past its live battle");
        };
        let p1 = battle.player1.player.id.clone();
        let p2 = battle.player2.as_ref().map(|c| c.player.id.clone());

        while room.current_battle().is_some_and(|b| !b.is_decided()) {
            if let Some(battle) = room.current_battle_mut() {
                let _ = engine::submit_move(battle, &p1, roll(rng), roll(rng), rng);
            }
            if let Some(p2) = &p2 {
                if let Some(battle) = room.current_battle_mut() {
                    if !battle.is_decided() {
                        let _ = engine::submit_move(battle, p2, roll(rng), roll(rng), rng);
                    }
                }
            }
        }

        let round = room.current_round;
        let winner = room
            .current_battle()
            .and_then(|b| b.winner.clone())
            .unwrap_or_default();
        println!("Round {}: {}", round + 1, winner);

        match tournament::advance(&mut room)? {
            Advance::Next { .. } => {}
            Advance::Complete { champion } => {
                println!("\nChampion: {}", champion.name);
                break;
            }
        }
    }

    println!("\n=== Bracket ===");
    for row in presence::round_rows(&room) {
        println!("{}", row.name);
        for battle in &row.battles {
            println!("  {battle}");
        }
    }
    Ok(())
}

fn roll(rng: &mut StdRng) -> Zone {
    match rng.gen_range(1..=3) {
        1 => Zone::High,
        2 => Zone::Mid,
        _ => Zone::Low,
    }
}
