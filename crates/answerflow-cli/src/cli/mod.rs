//! CLI entry and dispatch.

use std::path::PathBuf;

use answerflow_core::config;
use anyhow::{Context, Result};
use clap::Parser;

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "answerflow")]
#[command(version)]
#[command(about = "Ask a knowledge base and watch the answer stream in")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Ask a question and stream the answer
    Ask {
        /// The question to ask
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Continue an existing conversation
        #[arg(long, value_name = "ID", env = "ANSWERFLOW_CONVERSATION")]
        conversation: Option<String>,

        /// Print the final sanitized HTML instead of streaming plain text
        #[arg(long)]
        html: bool,

        /// Fetch the whole answer in one request
        #[arg(long = "no-stream")]
        no_stream: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print the effective configuration, environment overrides included
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.log_file.as_deref())?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            question,
            conversation,
            html,
            no_stream,
        } => {
            let config = config::Config::load().context("load config")?;
            commands::ask::run(commands::ask::AskOptions {
                question: &question,
                conversation_id: conversation.as_deref(),
                html,
                no_stream,
                config: &config,
            })
            .await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Show => {
                let config = config::Config::load().context("load config")?;
                commands::config::show(&config)
            }
        },
    }
}
