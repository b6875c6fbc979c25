//! CLI demo harness (A5, §2 ambient components): drives one in-process
//! session's `observe`/`learn`/`predict` loop over a text corpus for manual
//! exploration. Not a network server — each subcommand runs one operation
//! against a fresh in-memory engine and prints the result as JSON.

use clap::{Parser, Subcommand};
use kato::{Engine, InMemoryPatternStore, InMemoryVectorStore, LibraryId, Observation, SessionConfiguration, SessionId};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kato-cli", about = "Drive a KATO session from the command line")]
struct Cli {
    #[arg(long, default_value = "default-library")]
    library: String,

    #[arg(long, default_value = "default-session")]
    session: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Observe one or more whitespace-separated symbols as a single event.
    Observe { symbols: Vec<String> },
    /// Observe each line of a text file as one event, in order.
    ObserveFile { path: PathBuf },
    /// Learn the current STM as a pattern.
    Learn,
    /// Predict against the current STM.
    Predict,
    /// Clear the current session's STM.
    ClearStm,
    /// Drop every learned pattern in the session's library.
    ClearAll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let engine = Engine::new(Arc::new(InMemoryPatternStore::new()), Arc::new(InMemoryVectorStore::new()));
    let session_id = SessionId(cli.session.clone());
    let library_id = LibraryId::new(cli.library.clone());
    engine
        .create_session(session_id.clone(), library_id.clone(), SessionConfiguration::default())
        .await?;

    match cli.command {
        Command::Observe { symbols } => {
            let result = engine.observe(&session_id, &Observation::with_strings(symbols)).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::ObserveFile { path } => {
            let content = std::fs::read_to_string(&path)?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                let symbols: Vec<&str> = line.split_whitespace().collect();
                let result = engine.observe(&session_id, &Observation::with_strings(symbols)).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Command::Learn => {
            let name = engine.learn(&session_id).await?;
            println!("{}", name);
        }
        Command::Predict => {
            let envelope = engine.predict(&session_id).await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::ClearStm => {
            engine.clear_stm(&session_id).await?;
        }
        Command::ClearAll => {
            engine.clear_all(&library_id).await?;
        }
    }

    Ok(())
}
