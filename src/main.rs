use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod controller;
mod error;
mod events;
mod llm;
mod tui;
mod ui;

use config::Config;
use controller::{ConversationController, SubmitOutcome};
use llm::GeminiClient;
use ui::conversation::ConversationManager;

#[derive(Parser)]
#[command(name = "chatbox")]
#[command(version)]
#[command(about = "Terminal chat assistant for Gemini models", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.chatbox/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override the endpoint base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default)
    Chat,
    /// Send one prompt and print the reply
    Ask {
        /// The prompt to send
        prompt: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    match cli.command {
        None | Some(Commands::Chat) => {
            let log_path = Config::home_dir()?.join("chatbox.log");
            init_tracing(cli.verbose, Some(&log_path))?;
            let config = load_config(&cli, &config_path)?;
            let controller = build_controller(&config)?;
            let manager = ConversationManager::new(controller, config.ui.theme);
            app::run(manager).await
        }
        Some(Commands::Ask { ref prompt }) => {
            init_tracing(cli.verbose, None)?;
            let config = load_config(&cli, &config_path)?;
            ask(&config, prompt).await
        }
        Some(Commands::Config { ref action }) => {
            init_tracing(cli.verbose, None)?;
            match action.as_ref().unwrap_or(&ConfigAction::Show) {
                ConfigAction::Show => {
                    let config = load_config(&cli, &config_path)?;
                    print!("{}", toml::to_string_pretty(&config.redacted())?);
                }
                ConfigAction::Init => {
                    if config_path.exists() {
                        println!("Config already exists at {}", config_path.display());
                    } else {
                        Config::default().save_to(&config_path)?;
                        println!("Wrote default config to {}", config_path.display());
                    }
                }
                ConfigAction::Path => println!("{}", config_path.display()),
            }
            Ok(())
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "chatbox=info";

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("chatbox=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Set up tracing. The TUI owns the terminal, so interactive sessions log to a file.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = log_filter(verbose);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create log directory")?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli, path: &Path) -> Result<Config> {
    let mut config = Config::load_from(path)?;

    // Apply CLI overrides.
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

fn build_controller(config: &Config) -> Result<ConversationController> {
    let client = GeminiClient::new(config)?;
    tracing::info!(model = client.model(), endpoint = %config.base_url, "completion endpoint ready");
    Ok(ConversationController::new(Arc::new(client)))
}

/// One-shot exchange through the same controller the TUI uses
async fn ask(config: &Config, prompt: &str) -> Result<()> {
    let mut controller = build_controller(config)?;
    controller.update_draft(prompt);
    if controller.submit() != SubmitOutcome::Dispatched {
        return Ok(());
    }
    controller.settle().await;

    if let Some(reply) = controller
        .log()
        .iter()
        .find(|message| message.author() == events::Author::Assistant)
    {
        println!("{}", reply.text());
    }
    Ok(())
}
