//! sapcli - SoftAP Control CLI Tool
//!
//! Runs `get`/`set` requests against the local hostapd and driver
//! configuration, or forwards them to a running `sapd`.
//!
//! # Usage
//!
//! ```bash
//! sapcli get ssid
//! sapcli set channel=6
//! sapcli exec set commit
//! sapcli setup --ssid Guest --security wpa2-psk --passphrase secret123
//! sapcli remote get sta_mac_list
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libsapctl::registry::commands;
use libsapctl::{setup_softap, Dispatcher, Response, SapConfig, SetupOptions};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "/etc/sapctl/sapctl.toml";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "sapcli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SoftAP Control CLI - get and set access point parameters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one raw request line, e.g. `exec set ssid=MyNet`
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Read a parameter
    Get {
        /// Parameter name
        name: String,
    },

    /// Write a parameter
    Set {
        /// `name=value`, or a bare name for commit and reset_to_default
        assignment: String,
    },

    /// Configure SSID, security, passphrase and channel, then commit
    Setup {
        #[arg(long)]
        ssid: Option<String>,

        /// open, wep, wpa-psk or wpa2-psk
        #[arg(long)]
        security: Option<String>,

        #[arg(long)]
        passphrase: Option<String>,

        #[arg(long)]
        channel: Option<u32>,
    },

    /// Write a configuration file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Send a request line to a running sapd
    Remote {
        /// Daemon socket (defaults to the configured one)
        #[arg(long)]
        socket: Option<PathBuf>,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// List the parameters the engine understands
    List,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Initialize logging based on command-line arguments
fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { cli.log_level.as_str() };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("sapcli={},libsapctl={}", log_level, log_level))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn load_config(cli: &Cli) -> Result<SapConfig> {
    let path = config_path(cli);
    if cli.config.is_none() && !path.exists() {
        debug!("No configuration at {:?}, using defaults", path);
        return Ok(SapConfig::default());
    }
    SapConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// Print a response line; true when it reports success
fn report(response: &Response) -> bool {
    println!("{}", response);
    response.is_success()
}

fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Exec { words } => {
            let mut dispatcher = Dispatcher::from_config(load_config(cli)?);
            Ok(report(&dispatcher.execute(&words.join(" "))))
        }
        Commands::Get { name } => {
            let mut dispatcher = Dispatcher::from_config(load_config(cli)?);
            Ok(report(&dispatcher.execute(&format!("get {}", name))))
        }
        Commands::Set { assignment } => {
            let mut dispatcher = Dispatcher::from_config(load_config(cli)?);
            Ok(report(&dispatcher.execute(&format!("set {}", assignment))))
        }
        Commands::Setup {
            ssid,
            security,
            passphrase,
            channel,
        } => {
            let mut dispatcher = Dispatcher::from_config(load_config(cli)?);
            let options = SetupOptions {
                ssid: ssid.clone(),
                security: security.clone(),
                passphrase: passphrase.clone(),
                channel: *channel,
            };
            match setup_softap(&mut dispatcher, &options) {
                Ok(()) => {
                    println!("success");
                    Ok(true)
                }
                Err(e) => {
                    eprintln!("{}", e);
                    Ok(report(&e.response))
                }
            }
        }
        Commands::Init { force } => {
            let path = config_path(cli);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            SapConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(true)
        }
        Commands::Remote { socket, words } => {
            let socket = match socket {
                Some(socket) => socket.clone(),
                None => load_config(cli)?.paths.daemon_socket,
            };
            let reply = remote_request(&socket, &words.join(" "))?;
            println!("{}", reply);
            Ok(reply.starts_with(libsapctl::protocol::SUCCESS))
        }
        Commands::List => {
            for descriptor in commands() {
                let access = match (descriptor.handler.readable(), descriptor.handler.writable()) {
                    (true, true) => "rw",
                    (true, false) => "r-",
                    (false, true) => "-w",
                    (false, false) => "--",
                };
                println!(
                    "{:<2} {:<24} {}",
                    access,
                    descriptor.name,
                    descriptor.effective_default().unwrap_or("")
                );
            }
            Ok(true)
        }
    }
}

/// One request line out, one response line back
fn remote_request(socket: &Path, line: &str) -> Result<String> {
    let mut stream = UnixStream::connect(socket)
        .with_context(|| format!("connecting to sapd at {}", socket.display()))?;
    stream.set_read_timeout(Some(REMOTE_TIMEOUT))?;

    writeln!(stream, "{}", line)?;
    stream.flush()?;

    let mut reply = String::new();
    BufReader::new(stream)
        .read_line(&mut reply)
        .context("reading sapd reply")?;
    if reply.is_empty() {
        bail!("sapd closed the connection without replying");
    }
    Ok(reply.trim_end().to_string())
}
