//! ThinkGear Reader CLI
//!
//! Connects to a headset through the vendor driver and prints signal
//! quality, attention and meditation until interrupted.

use anyhow::Result;
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use thinkgear_reader::{
    run_session, BaudRate, Config, DataType, NativeDriver, ReaderError, Shutdown, StreamFormat,
    VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "thinkgear-reader")]
#[command(version = VERSION)]
#[command(about = "Read eSense values from a ThinkGear headset", long_about = None)]
struct Cli {
    /// Serial port the headset is paired on (e.g. /dev/tty.MindWaveMobile-DevA)
    port: String,

    /// Driver bundle or shared library to load
    #[arg(long)]
    bundle: Option<PathBuf>,

    /// Serial baud rate (1200, 2400, 4800, 9600, 57600, 115200)
    #[arg(long)]
    baud: Option<BaudRate>,

    /// Stream format requested from the headset
    #[arg(long, value_enum)]
    stream_format: Option<StreamFormat>,

    /// Milliseconds between polls
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,

    /// Comma-separated channels to print (e.g. poor_signal,attention,meditation)
    #[arg(long, value_parser = parse_channels)]
    channels: Option<ChannelList>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct ChannelList(Vec<DataType>);

fn parse_channels(s: &str) -> Result<ChannelList, String> {
    DataType::parse_list(s).map(ChannelList)
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1; --help and --version exit 0.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    init_logging();

    let shutdown = Shutdown::new();
    if let Err(e) = install_interrupt_handler(shutdown.clone()) {
        eprintln!("Error: could not install interrupt handler: {e}");
        process::exit(1);
    }

    if let Err(e) = run(&cli, &shutdown) {
        let reported = e
            .downcast_ref::<ReaderError>()
            .map_or(false, ReaderError::is_reported);
        if !reported {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }

    // The poll loop only returns after an interrupt.
    process::exit(if shutdown.is_triggered() { 1 } else { 0 });
}

fn run(cli: &Cli, shutdown: &Shutdown) -> Result<()> {
    let config = resolve_config(cli)?;

    // Dropped after the session, so the library is unloaded last.
    let driver = NativeDriver::load(&config.bundle_path)?;
    run_session(
        &driver,
        &cli.port,
        &config,
        shutdown,
        &mut io::stdout().lock(),
        &mut io::stderr(),
    )?;
    Ok(())
}

/// Layer command-line overrides on top of the configuration file.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("{e}; using default configuration");
            Config::default()
        }),
    };

    if let Some(bundle) = &cli.bundle {
        config.bundle_path = bundle.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud = baud;
    }
    if let Some(stream_format) = cli.stream_format {
        config.stream_format = stream_format;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.poll_interval = std::time::Duration::from_millis(interval_ms);
    }
    if let Some(ChannelList(channels)) = &cli.channels {
        config.channels = channels.clone();
    }

    config.validate()?;
    tracing::debug!(?config, "configuration resolved");
    Ok(config)
}

/// Log to stderr so stdout carries only readings. `RUST_LOG` overrides the
/// default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Set up the Ctrl+C handler.
///
/// The first interrupt asks the poll loop to stop; a second one while
/// cleanup is still running exits immediately.
fn install_interrupt_handler(shutdown: Shutdown) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if shutdown.trigger() > 1 {
            eprintln!("\nInterrupted again, exiting without cleanup.");
            process::exit(1);
        }
    })
}
