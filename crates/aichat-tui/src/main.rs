use std::path::PathBuf;
use std::time::Duration;

use aichat_core::{build_provider, Config, Controller, Dispatcher, OllamaClient, Provider};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "aichat")]
#[command(about = "Terminal chat window for Ollama, Claude and OpenAI", version)]
struct Cli {
    /// Provider to use: ollama, claude or openai
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name (defaults to the provider's default)
    #[arg(short, long)]
    model: Option<String>,

    /// Request timeout in seconds, 0 to wait forever
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Log file (defaults to the local data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Remember provider, model and timeout as the new defaults
    #[arg(long)]
    save: bool,
}

const OLLAMA_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Command-line flags take precedence over the config file
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(name) = &cli.provider {
        let provider = match Provider::from_str(name) {
            Some(provider) => provider,
            None => {
                let names: Vec<&str> = Provider::all().iter().map(|p| p.as_str()).collect();
                bail!("unknown provider '{}' (expected one of: {})", name, names.join(", "))
            }
        };
        // A model from the file belongs to whatever provider the file named
        if provider != config.selected_provider() {
            config.default_model = None;
        }
        config.provider = Some(provider.as_str().to_string());
    }
    if let Some(model) = &cli.model {
        config.default_model = Some(model.clone());
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = Some(secs);
    }
    Ok(())
}

/// Ollama accepts a bare name for the `:latest` tag
fn model_is_pulled(available: &[String], model: &str) -> bool {
    available
        .iter()
        .any(|name| name == model || name.strip_suffix(":latest") == Some(model))
}

/// Ask the local server whether the model exists before the first message
/// fails with a generic reply. Returns a footer notice when something is off.
async fn check_ollama_model(config: &Config) -> Option<&'static str> {
    let base_url = config.base_url(Provider::Ollama);
    let model = config.model();
    let client = OllamaClient::new(&base_url);

    match tokio::time::timeout(OLLAMA_CHECK_TIMEOUT, client.list_models()).await {
        Ok(Ok(models)) if model_is_pulled(&models, &model) => None,
        Ok(Ok(models)) => {
            warn!(model = %model, available = ?models, "model not found on the Ollama server");
            Some("Model not found on the Ollama server, see log")
        }
        Ok(Err(e)) => {
            warn!(url = %base_url, error = %e, "Ollama server unreachable");
            Some("Ollama server not reachable, see log")
        }
        Err(_) => {
            warn!(url = %base_url, "Ollama server did not answer the model check");
            Some("Ollama server not reachable, see log")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::init(&log_path)?;

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });
    apply_overrides(&mut config, &cli)?;

    if cli.save {
        match config.save() {
            Ok(()) => info!("saved defaults to the config file"),
            Err(e) => warn!(error = %e, "could not save config"),
        }
    }

    let provider = config.selected_provider();
    let client = build_provider(&config).with_context(|| {
        format!(
            "set {} or add the key to {}",
            match provider {
                Provider::Claude => "ANTHROPIC_API_KEY",
                _ => "OPENAI_API_KEY",
            },
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        )
    })?;

    let dispatcher = Dispatcher::new(client, config.model()).with_timeout(config.request_timeout());
    info!(
        provider = dispatcher.provider_name(),
        model = dispatcher.model(),
        timeout = ?config.request_timeout(),
        "starting"
    );

    let mut app = App::new(Controller::new(dispatcher), provider);
    if provider == Provider::Ollama {
        app.notice = check_ollama_model(&config).await;
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    app.controller.shutdown();
    tui::restore()?;
    info!("exiting");

    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event),
                None => break,
            },
            Some(reply) = app.controller.next_reply() => app.receive(reply),
        }
    }

    Ok(())
}
