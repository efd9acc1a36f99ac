use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jarvis_gateway::db::{self, MemoryStore};
use jarvis_gateway::{Config, Daemon};

/// Jarvis - voice assistant command gateway
#[derive(Parser)]
#[command(name = "jarvis", version, about)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, env = "JARVIS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one command through the pipeline and print the reply
    Ask {
        /// Command text, as the speech front end would send it
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Read or write persistent facts
    Fact {
        #[command(subcommand)]
        action: FactAction,
    },
    /// Delete expired conversation entries now
    Sweep,
}

#[derive(Subcommand)]
enum FactAction {
    /// Store a fact (overwrites)
    Set { key: String, value: String },
    /// Print a fact
    Get { key: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,jarvis_gateway=info",
        1 => "info,jarvis_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", fatal_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// Error report including every context layer
fn fatal_message(e: &anyhow::Error) -> String {
    format!("fatal: {e:#}")
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Ask { text }) => ask(config, &text.join(" ")).await,
        Some(Command::Fact { action }) => fact(&config, action),
        Some(Command::Sweep) => sweep(&config),
        None => {
            tracing::info!(addr = %config.listen_addr(), "starting jarvis gateway");
            Daemon::new(config)
                .context("failed to start daemon")?
                .run()
                .await?;
            Ok(())
        }
    }
}

/// Process a single command without the network layer
async fn ask(config: Config, text: &str) -> anyhow::Result<()> {
    let daemon = Daemon::new(config).context("failed to start daemon")?;
    let reply = daemon.processor().process(text).await;
    println!("{reply}");
    Ok(())
}

fn open_memory(config: &Config) -> anyhow::Result<MemoryStore> {
    let pool = db::init(&config.memory.db_path)
        .with_context(|| format!("failed to open memory at {}", config.memory.db_path.display()))?;
    Ok(MemoryStore::with_retention(pool, config.memory.retention))
}

fn fact(config: &Config, action: FactAction) -> anyhow::Result<()> {
    let memory = open_memory(config)?;
    match action {
        FactAction::Set { key, value } => {
            memory.set_fact(&key, &value)?;
            println!("{key} = {value}");
        }
        FactAction::Get { key } => match memory.get_fact(&key)? {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("no fact stored for '{key}'"),
        },
    }
    Ok(())
}

fn sweep(config: &Config) -> anyhow::Result<()> {
    let removed = open_memory(config)?.sweep_expired()?;
    println!("Removed {removed} expired conversation entries");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarvis_gateway::config::JarvisConfigFile;

    #[test]
    fn test_fatal_message_keeps_cause() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let mut config = Config::from_file(JarvisConfigFile::default(), dir.path().to_path_buf());
        config.memory.db_path = blocker.join("memory.db");

        let err = open_memory(&config).err().unwrap();
        let message = fatal_message(&err);

        assert!(message.starts_with("fatal: failed to open memory at "));
        assert!(message.contains(": "), "cause missing from {message}");
        assert!(message.len() > format!("fatal: {err}").len());
    }
}
