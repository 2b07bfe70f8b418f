//! warden-cli — poke a game server's RCon channel from the terminal.
//!
//! ```text
//! warden-cli status                 Server name, slots, gamestate
//! warden-cli players                Connected players
//! warden-cli exec <command>         Run a raw command
//! warden-cli logs [--minutes N]     Tail the admin log
//! warden-cli --gen-config           Write default config to stdout
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_core::logs::{LogAction, LogLoop, LogLoopOptions};
use warden_core::{v1, Deadline, RconConfig};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "warden-cli", about = "Game-server RCon administration CLI")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "warden.toml")]
    config: PathBuf,

    /// Override the configured host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured password.
    #[arg(long)]
    password: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Server name, slots, and current round.
    Status,
    /// Players currently connected.
    Players,
    /// Run a raw command and print the reply.
    Exec {
        /// The command, e.g. `get mapsforrotation`.
        command: Vec<String>,
    },
    /// Tail the admin log until Ctrl-C.
    Logs {
        /// History window of the first fetch.
        #[arg(long, default_value_t = 60)]
        minutes: u64,
    },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&RconConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = RconConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(password) = cli.password {
        config.server.password = password;
    }

    info!("warden-cli v{}", env!("CARGO_PKG_VERSION"));
    info!("target: {}:{}", config.server.host, config.server.port);

    let pool = v1::connection_pool_with(
        config.server.host.clone(),
        config.server.port,
        config.server.password.clone(),
        config.pool_options(),
    );

    let deadline = Deadline::after(Duration::from_secs(10));
    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            let mut conn = pool.get(deadline).await?;
            let name = conn.server_name().await?;
            let (current, max) = conn.slots().await?;
            let state = conn.game_state().await?;
            drop(conn);

            println!("{name}");
            println!("players   {current}/{max} (allies {}, axis {})", state.players.allies, state.players.axis);
            println!("map       {} (next: {})", state.map, state.next_map);
            println!("score     allies {} - axis {}", state.score.allies, state.score.axis);
            println!("remaining {:?}", state.remaining_time);
        }
        Command::Players => {
            let mut conn = pool.get(deadline).await?;
            let players = conn.player_ids().await?;
            drop(conn);

            for player in &players {
                println!("{:<20} {}", player.id, player.name);
            }
            println!("{} players online", players.len());
        }
        Command::Exec { command } => {
            let command = command.join(" ");
            let mut conn = pool.get(deadline).await?;
            let reply = conn.command(&command).await?;
            drop(conn);
            println!("{reply}");
        }
        Command::Logs { minutes } => {
            let log_loop = LogLoop::with_options(
                pool.clone(),
                LogLoopOptions {
                    initial_window: Duration::from_secs(minutes * 60),
                    ..config.log_loop_options()
                },
            );

            let token = log_loop.cancellation_token();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Ctrl-C received — stopping log loop");
                token.cancel();
            });

            log_loop
                .run(|batch| {
                    for event in &batch {
                        print_event(event);
                    }
                    false
                })
                .await?;
        }
    }

    pool.shutdown();
    Ok(())
}

fn print_event(event: &warden_core::logs::LogEvent) {
    let when = event.timestamp.format("%H:%M:%S");
    match event.action {
        LogAction::Kill => println!(
            "{when} KILL  {} ({}) -> {} ({}) [{}]",
            event.actor.name, event.actor.team, event.subject.name, event.subject.team, event.weapon
        ),
        LogAction::Chat => println!(
            "{when} CHAT  [{}] {}: {}",
            event.channel, event.actor.name, event.message
        ),
        LogAction::Connected | LogAction::Disconnected => {
            println!("{when} {:<5} {}", event.action.to_string(), event.actor.name)
        }
        LogAction::MatchStart => println!("{when} MATCH START {}", event.message),
        LogAction::MatchEnded => {
            let result = event
                .result
                .map(|r| format!(" (allies {} - axis {})", r.allied, r.axis))
                .unwrap_or_default();
            println!("{when} MATCH ENDED {}{result}", event.message);
        }
        LogAction::Other => println!("{when} {}", event.raw),
    }
}
