//! Inbox Pilot CLI.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inbox_pilot::automation::core::BrowserSession;
use inbox_pilot::automation::state::{ControlActor, RunContext, SessionProvider, StatusSink};
use inbox_pilot::automation::{Autopilot, RunOptions};
use inbox_pilot::config::PilotConfig;
use inbox_pilot::models::{Settings, StatusEvent};
use inbox_pilot::storage::SettingsStore;
use inbox_pilot::{run_server, AppState};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "inbox-pilot")]
#[command(about = "Answers direct-message threads in a scripted Chromium session")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "inbox-pilot.toml", global = true)]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the control API
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Process the inbox once; Ctrl-C stops after the current chat
    Run {
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Pause between chats in milliseconds
        #[arg(long)]
        delay: Option<u64>,
        /// Number of recent messages sent as context
        #[arg(long)]
        messages: Option<usize>,
    },
    /// Show or change saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        delay: Option<u64>,
        #[arg(long)]
        messages: Option<usize>,
    },
}

/// Logs run progress to the console.
struct LogSink;

impl StatusSink for LogSink {
    fn emit(&self, event: StatusEvent) {
        match event {
            StatusEvent::Stats { stats } => info!(
                processed = stats.processed,
                responded = stats.responded,
                skipped = stats.skipped,
                "stats"
            ),
            StatusEvent::CurrentChat { name, status } => info!(chat = %name, "{status}"),
            StatusEvent::Alert { message } => warn!("{message}"),
            StatusEvent::Completed => info!("automation completed"),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "inbox_pilot=debug,info" } else { "inbox_pilot=info,warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer())
        .init();
}

fn apply(settings: &mut Settings, api_key: Option<String>, delay: Option<u64>, messages: Option<usize>) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        settings.api_key = Some(key.trim().to_string());
    }
    if let Some(delay) = delay {
        settings.delay = delay;
    }
    if let Some(messages) = messages {
        settings.message_count = messages;
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PilotConfig::load(&cli.config)?;
    let store = SettingsStore::new(&config.settings.path);
    let options = RunOptions {
        pacing: config.pacing,
        sender_policy: config.page.sender_policy,
    };

    match cli.command {
        Commands::Serve { bind } => {
            let (actor, pilot) = ControlActor::new(BrowserSession::new(&config), options);
            tokio::spawn(actor.run());

            let addr = bind.unwrap_or(config.server.bind);
            let state = AppState { pilot, settings: store };
            tokio::select! {
                result = run_server(addr, state) => result?,
                _ = tokio::signal::ctrl_c() => info!("shutting down"),
            }
        }
        Commands::Run { api_key, delay, messages } => {
            let run_config = store.commit_run(|s| apply(s, api_key, delay, messages))?;

            let session = BrowserSession::new(&config);
            let generator = session.generator(&run_config)?;
            let page = session.open_page().await?;

            let mut ctx = RunContext::new(run_config);
            let stop = ctx.stop_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("stop requested, finishing current chat");
                    stop.stop();
                }
            });

            let pilot = Autopilot::new(page, generator, Arc::new(LogSink), options);
            let phase = pilot.run(&mut ctx).await;
            session.release(pilot.into_page()).await;
            session.shutdown().await;

            let stats = ctx.stats();
            println!(
                "{:?}: processed {}, responded {}, skipped {}",
                phase, stats.processed, stats.responded, stats.skipped
            );
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                let settings = store.load()?.masked();
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            SettingsAction::Set { api_key, delay, messages } => {
                let settings = store.update(|s| apply(s, api_key, delay, messages))?;
                println!("{}", serde_json::to_string_pretty(&settings.masked())?);
            }
        },
    }

    Ok(())
}
