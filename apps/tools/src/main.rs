use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::{BindingError, SessionGameBinding};
use shared::{
    domain::{Player, SessionId},
    protocol::GAME_SESSION_KEY,
    score::ScoreState,
};
use storage::{Storage, StoredSessionEntry};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/sessions.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every stored game with its current label.
    List,
    /// Print the label, starting a game if the session has none.
    Show {
        session: SessionId,
    },
    /// Award a point; fails if the session has no game yet.
    Score {
        session: SessionId,
        player: Player,
    },
    /// Forget everything stored for the session, including its game.
    Reset {
        session: SessionId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;
    let games = SessionGameBinding::new(Arc::new(storage.clone()));

    match cli.command {
        Command::List => {
            for (entry, game) in decode_games(storage.list_entries(GAME_SESSION_KEY).await?) {
                println!(
                    "{}\t{}\t{}-{}\t{}",
                    entry.session_id,
                    entry.updated_at.to_rfc3339(),
                    game.player1_points(),
                    game.player2_points(),
                    game
                );
            }
        }
        Command::Show { session } => {
            let game = games.get_or_create_game(session).await?;
            println!("{game}");
        }
        Command::Score { session, player } => match games.apply_point_and_persist(session, player).await {
            Ok(game) => println!("{game}"),
            Err(BindingError::GameNotFound(_)) => {
                println!("no game for session {session}; run `show` to start one");
            }
            Err(err) => return Err(err.into()),
        },
        Command::Reset { session } => {
            let removed = storage.clear_session(session).await?;
            println!("reset session {session}: removed {removed} entries");
        }
    }

    Ok(())
}

/// Entries that hold a readable game; anything else is logged and skipped.
fn decode_games(entries: Vec<StoredSessionEntry>) -> Vec<(StoredSessionEntry, ScoreState)> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry.value.clone()) {
            Ok(game) => Some((entry, game)),
            Err(error) => {
                warn!(session_id = %entry.session_id, %error, "skipping unreadable game");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
