use anyhow::{Context, Result};
use clap::Parser;

mod app;
mod client;
mod config;
mod conversation;
mod handler;
mod markdown;
mod scroll;
mod session;
mod tui;
mod typing;
mod ui;

use app::App;
use config::Config;
use session::FileStore;

#[derive(Parser)]
#[command(name = "doppel")]
#[command(about = "Terminal chat with a language model standing in for a real person")]
#[command(version)]
struct Cli {
    /// Backend base URL, overriding the config file and DOPPEL_BACKEND_URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Forget the stored session id and start a fresh one
    #[arg(long)]
    reset_session: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not read config, using defaults");
        Config::default()
    });
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    } else if let Ok(url) = std::env::var("DOPPEL_BACKEND_URL") {
        config.backend_url = url;
    }

    if cli.reset_session {
        FileStore::reset_default().context("resetting session store")?;
    }
    let mut store = FileStore::open_default().context("opening session store")?;
    let session_id = session::get_or_create(&mut store).context("resolving session id")?;

    tracing::info!(backend = %config.backend_url, session = %session_id, "starting");

    let mut app = App::new(&config, session_id)?;

    tui::install_panic_hook();
    let mut terminal = tui::init().context("initializing terminal")?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore().context("restoring terminal")?;

    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(typing::TICK);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
        app.poll_response();
    }

    Ok(())
}

/// Routes tracing output to a file so it never fights the terminal UI.
fn init_logging() -> Result<()> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
        .join("doppel");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("doppel.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
