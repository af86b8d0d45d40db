use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use repo_chat::commands::{index_repository, load_config, run_chat};
use repo_chat::config::{run_interactive_config, show_config};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repo-chat")]
#[command(about = "Chat with a local code repository using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default)
    Chat {
        /// Repository to index before chatting
        #[arg(long)]
        repo: Option<String>,
    },
    /// Index a repository without starting a chat
    Index {
        /// Path to the repository
        path: String,
    },
    /// Configure the embedding and chat services
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repo_chat={},lance=warn,lancedb=warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let config = load_config(cli.config_dir.as_deref())?;

    match cli.command.unwrap_or(Commands::Chat { repo: None }) {
        Commands::Chat { repo } => run_chat(config, repo).await?,
        Commands::Index { path } => index_repository(config, &path).await?,
        Commands::Config { show } => {
            if show {
                show_config(&config);
            } else {
                run_interactive_config(config)?;
            }
        }
    }

    Ok(())
}
