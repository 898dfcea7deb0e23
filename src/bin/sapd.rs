//! SoftAP Control Daemon (sapd)
//!
//! Serves the `get`/`set` protocol on a Unix stream socket. Each line a
//! client sends is one request and gets exactly one response line back.
//! Requests from all clients go through a single dispatcher, one at a time.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (requires root/sudo)
//! sudo sapd
//!
//! # Custom configuration and verbose logging
//! sudo sapd --config /etc/sapctl/sapctl.toml --verbose
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use libsapctl::{Dispatcher, SapConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "/etc/sapctl/sapctl.toml";

/// SoftAP Control Daemon
#[derive(Parser, Debug)]
#[command(name = "sapd")]
#[command(version)]
#[command(about = "SoftAP Control Daemon - serves the get/set protocol on a Unix socket", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Listen here instead of the configured socket
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

type SharedDispatcher = Arc<Mutex<Dispatcher>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting SoftAP Control Daemon (sapd)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    #[cfg(target_os = "linux")]
    {
        let uid = unsafe { libc::getuid() };
        if uid != 0 {
            warn!("Not running as root - driver and hostapd control may fail");
        }
    }

    let config = load_config(&args)?;
    let socket_path = args
        .socket
        .clone()
        .unwrap_or_else(|| config.paths.daemon_socket.clone());

    let listener = bind(&socket_path)?;
    info!("Listening on {}", socket_path.display());

    let dispatcher: SharedDispatcher = Arc::new(Mutex::new(Dispatcher::from_config(config)));

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_client(stream, dispatcher).await {
                            warn!("Client session ended with error: {:#}", e);
                        }
                    });
                }
                Err(e) => error!("Failed to accept connection: {}", e),
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Signal handler error: {:#}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down SoftAP Control Daemon...");
    if let Err(e) = std::fs::remove_file(&socket_path) {
        warn!("Failed to remove {}: {}", socket_path.display(), e);
    }

    info!("SoftAP Control Daemon stopped");
    Ok(())
}

/// Initialize logging based on command-line arguments
fn init_logging(args: &Args) {
    let log_level = if args.verbose { "debug" } else { args.log_level.as_str() };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("sapd={},libsapctl={}", log_level, log_level))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(atty::is(atty::Stream::Stdout))
        .init();
}

fn load_config(args: &Args) -> Result<SapConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if args.config.is_none() && !path.exists() {
        info!("No configuration at {}, using defaults", path.display());
        return Ok(SapConfig::default());
    }
    SapConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// Bind the listener, replacing a stale socket left by a previous run
fn bind(path: &Path) -> Result<UnixListener> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    if path.exists() {
        debug!("Removing stale socket {}", path.display());
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }

    let listener =
        UnixListener::bind(path).with_context(|| format!("binding {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }

    Ok(listener)
}

async fn serve_client(stream: UnixStream, dispatcher: SharedDispatcher) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let dispatcher = dispatcher.clone();
        let response = tokio::task::spawn_blocking(move || {
            let mut dispatcher = dispatcher.lock().unwrap_or_else(|e| e.into_inner());
            dispatcher.execute(&line)
        })
        .await
        .context("request task failed")?;

        writer.write_all(format!("{}\n", response).as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("Client disconnected");
    Ok(())
}

/// Resolve on SIGTERM or SIGINT
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, initiating graceful shutdown");
    }

    Ok(())
}
