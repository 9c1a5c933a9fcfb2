#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use mirror_overlay::config::OverlayConfig;
use mirror_overlay::host::{Collaborators, SystemClock};
use mirror_overlay::ipc::{
    ForwardedCommand, OverlayClient, OverlayRequest, OverlayResponse, OverlayServer,
};
use mirror_overlay::overlay::{OverlayCommands, OverlayService};
use mirror_overlay::replay::{self, ReplayScript};

#[derive(Parser, Debug)]
#[command(name = "mirror-overlay", version, about = "Floating mirror overlay daemon and control tool")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Command socket (defaults to $XDG_RUNTIME_DIR/mirror-overlay/overlay.sock)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the overlay daemon (default)
    Run,
    /// Send one request to a running daemon
    Send {
        #[command(subcommand)]
        request: SendRequest,
    },
    /// Play a JSON script against headless collaborators and print the final state
    Replay { script: PathBuf },
}

#[derive(Subcommand, Debug)]
enum SendRequest {
    Start {
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        package: Option<String>,
        #[arg(long)]
        activity: Option<String>,
    },
    Stop,
    Toggle,
    Passthrough {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    State,
    Ping,
}

impl From<SendRequest> for OverlayRequest {
    fn from(request: SendRequest) -> Self {
        match request {
            SendRequest::Start {
                question,
                package,
                activity,
            } => OverlayRequest::Start {
                question,
                target_package: package,
                target_activity: activity,
            },
            SendRequest::Stop => OverlayRequest::Stop,
            SendRequest::Toggle => OverlayRequest::ToggleSize,
            SendRequest::Passthrough { enabled } => OverlayRequest::SetTouchPassthrough { enabled },
            SendRequest::State => OverlayRequest::GetState,
            SendRequest::Ping => OverlayRequest::Ping,
        }
    }
}

fn init_logging() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn load_config(path: Option<PathBuf>) -> Result<OverlayConfig> {
    match path {
        Some(path) => OverlayConfig::load_from(&path),
        None => OverlayConfig::load(),
    }
}

fn run_daemon(config: OverlayConfig, socket: Option<PathBuf>) -> Result<()> {
    let (host, shutdown) = Collaborators::headless(
        config.screen.metrics(),
        config.screen.density,
        Box::new(SystemClock::new()),
    );
    let mut service = OverlayService::new(&config, host);

    let server = match socket {
        Some(path) => OverlayServer::bind_to(path)?,
        None => OverlayServer::bind()?,
    };
    let (tx, rx) = mpsc::channel::<ForwardedCommand>();
    server.serve(service.store(), tx)?;

    let terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&terminate)).context("Failed to register SIGINT handler")?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&terminate)).context("Failed to register SIGTERM handler")?;

    let frame_interval = Duration::from_millis(config.timing.frame_interval_ms);
    let mut stop_sent = false;
    let mut shutdown_at: Option<Instant> = None;
    info!(frame_interval_ms = config.timing.frame_interval_ms, "Overlay daemon running");

    loop {
        if !stop_sent && terminate.load(Ordering::Relaxed) {
            info!("Termination signal received, stopping overlay");
            service.stop();
            stop_sent = true;
        }

        match rx.recv_timeout(frame_interval) {
            Ok(forwarded) => {
                service.submit(forwarded.command.clone());
                forwarded.respond(OverlayResponse::Ack);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Command socket thread exited, shutting down");
                break;
            }
        }

        service.on_frame();

        if shutdown_at.is_none() {
            if let Some(delay_ms) = shutdown.requested() {
                info!(delay_ms, "Shutdown requested");
                shutdown_at = Some(Instant::now() + Duration::from_millis(delay_ms));
            }
        }
        if shutdown_at.is_some_and(|at| Instant::now() >= at) {
            break;
        }
    }

    service.teardown();
    drop(server);
    info!("Overlay daemon stopped");
    Ok(())
}

fn send(request: SendRequest, socket: Option<PathBuf>) -> Result<()> {
    let mut client = match socket {
        Some(path) => OverlayClient::connect_to(&path)?,
        None => OverlayClient::connect()?,
    };
    let response = client.request(request.into())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to format response")?
    );
    if let OverlayResponse::Error(message) = response {
        anyhow::bail!("Daemon rejected request: {message}");
    }
    Ok(())
}

fn run_replay(script: PathBuf, config: OverlayConfig) -> Result<()> {
    let script = ReplayScript::load(&script)?;
    let report = replay::run(&script, &config)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to format replay report")?
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    match cli.command.unwrap_or(Mode::Run) {
        Mode::Run => run_daemon(load_config(cli.config)?, cli.socket),
        Mode::Send { request } => send(request, cli.socket),
        Mode::Replay { script } => run_replay(script, load_config(cli.config)?),
    }
}
