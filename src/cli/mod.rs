//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::AuthManager;
use crate::cli::say::run_say;
use crate::core::config::{
    Config, DEFAULT_DEVELOPER_MESSAGE, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
use crate::core::session::SessionSettings;
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "confab")]
#[command(about = "A terminal chat client with streaming replies")]
#[command(
    long_about = "Confab is a full-screen terminal chat client that streams replies from a \
chat endpoint in real time. Replies render incrementally as they arrive, and a single \
exchange is in flight at a time.\n\n\
Authentication:\n\
  Use 'confab auth' to store an API key in your system keyring.\n\
  Set CONFAB_API_KEY to override the keyring for one run.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a newline in the input field\n\
  Esc               Interrupt the streaming reply\n\
  PageUp/PageDown   Scroll through the conversation\n\
  Mouse wheel       Scroll through the conversation\n\
  Ctrl+L            Clear the conversation\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to request for each exchange
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the chat endpoint
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Developer message sent with every exchange
    #[arg(short = 'd', long, global = true, value_name = "TEXT")]
    pub developer_message: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Start the chat interface (default)
    Chat,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Send one prompt and print the streamed reply to stdout
    Say {
        /// Prompt text (all words are joined with spaces)
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    // Silent unless RUST_LOG asks for output; stderr keeps the TUI clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Auth => {
            let auth_manager = AuthManager::new();
            if let Err(e) = auth_manager.interactive_auth() {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            let auth_manager = AuthManager::new();
            if let Err(e) = auth_manager.interactive_deauth() {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let value = value
                .filter(|parts| !parts.is_empty())
                .map(|parts| parts.join(" "));
            match value {
                Some(val) => {
                    *config_slot(&mut config, &key) = Some(val.clone());
                    config.save()?;
                    println!("✅ Set {key} to: {val}");
                }
                None => config.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            *config_slot(&mut config, &key) = None;
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::Chat => {
            let settings = resolve_settings(args.model, args.endpoint, args.developer_message)?;
            run_chat(settings).await
        }
        Commands::Say { prompt } => {
            let settings = resolve_settings(args.model, args.endpoint, args.developer_message)?;
            run_say(prompt, settings).await
        }
    }
}

fn config_slot<'a>(config: &'a mut Config, key: &str) -> &'a mut Option<String> {
    match key {
        "default-model" => &mut config.default_model,
        "endpoint" => &mut config.endpoint,
        "developer-message" => &mut config.developer_message,
        _ => {
            eprintln!("❌ Unknown config key: {key}");
            eprintln!("Known keys: default-model, endpoint, developer-message");
            std::process::exit(1);
        }
    }
}

fn resolve_settings(
    model: Option<String>,
    endpoint: Option<String>,
    developer_message: Option<String>,
) -> Result<SessionSettings, Box<dyn Error>> {
    let config = Config::load()?;
    let api_key = AuthManager::new().resolve_api_key()?;
    if api_key.is_empty() {
        tracing::warn!("no API key configured; requests carry no Authorization header");
    }
    Ok(resolve_settings_with(
        config,
        api_key,
        model,
        endpoint,
        developer_message,
    ))
}

/// Applies the resolution order for every setting: command-line flag, then
/// config file, then built-in default.
fn resolve_settings_with(
    config: Config,
    api_key: String,
    model: Option<String>,
    endpoint: Option<String>,
    developer_message: Option<String>,
) -> SessionSettings {
    SessionSettings {
        endpoint: endpoint
            .or(config.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        api_key,
        model: model
            .or(config.default_model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        developer_message: developer_message
            .or(config.developer_message)
            .unwrap_or_else(|| DEFAULT_DEVELOPER_MESSAGE.to_string()),
    }
}
