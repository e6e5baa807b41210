//! Command-line interface parsing and handling
//!
//! The terminal is the rendering surface: it prints visible messages and
//! streamed fragments and feeds prompts and image files into the session.

pub mod chat;
pub mod render;
pub mod say;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::chat::run_chat;
use crate::cli::say::run_say;
use crate::core::chat_stream::HttpCompletionService;
use crate::core::config::Config;

const LOG_ENV_VAR: &str = "COLOR_COMPASS_LOG";

#[derive(Parser)]
#[command(name = "color-compass")]
#[command(about = "A terminal chat assistant for colorblind-friendly visuals")]
#[command(
    long_about = "Color Compass streams answers from an OpenAI-compatible vision model. \
Ask about color theory and perception, or attach PNG/JPEG/GIF/WebP images for \
accessibility advice. Every request asks the model to keep its answers usable \
for colorblind readers.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY      Your API key (required)\n\
  OPENAI_BASE_URL     Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\
  COLOR_COMPASS_LOG   Log filter, e.g. 'debug' (optional, defaults to 'warn')\n\n\
Chat commands:\n\
  /image <path>...    Attach one or more images\n\
  /history            Show the conversation so far\n\
  /reset              Start over with an empty conversation\n\
  /quit               Exit\n\
  Ctrl+C              Stop the reply currently streaming, or exit at the prompt"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature (0.0 to 2.0)
    #[arg(short = 't', long, global = true)]
    pub temperature: Option<f32>,

    /// Maximum tokens per reply
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Send a single prompt, stream the reply and exit
    Say {
        /// Attach an image (repeatable)
        #[arg(short = 'i', long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
        /// Prompt text
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
}

impl Args {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            config.temperature = Some(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = Some(max_tokens);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from_path(path)?;
            config.apply_env_overrides();
            config
        }
        None => Config::load()?,
    };
    args.apply_to(&mut config);
    Ok(config)
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let service = HttpCompletionService::new(config.http_client()?, config.base_url(), &api_key);

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config, &service).await,
        Commands::Say { images, prompt } => run_say(&config, &service, prompt, images).await,
    }
}
