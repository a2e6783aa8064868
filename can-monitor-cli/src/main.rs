//! CAN Monitor CLI Application
//!
//! Command-line front end for the can-monitor-core library. It loads a
//! pre-parsed catalog, wires Ctrl+C to the session's cancellation flag,
//! replays frames from a file (a live bus backend is any `FrameSource`
//! implementation), prints first-sighting banners and an end-of-session
//! summary.

use anyhow::{bail, Result};
use can_monitor_core::{CancelFlag, FlushOutcome, SessionConfig, SessionLoop, SessionMode};
use clap::Parser;
use std::path::PathBuf;

mod catalog_file;
mod config;
mod notify;

/// CAN Monitor - decode live CAN traffic and log a session
#[derive(Parser, Debug)]
#[command(name = "can-monitor-cli")]
#[command(about = "Decode CAN frames against a signal catalog and log the session", long_about = None)]
#[command(version)]
struct Args {
    /// Pre-parsed catalog file (JSON array of message layouts)
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Frame replay file (JSON lines, one frame per line)
    #[arg(long, value_name = "FILE")]
    frames: Option<PathBuf>,

    /// Session mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Output directory for session files
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Signal allow-list entry for logging mode (can be repeated)
    #[arg(long = "signal", value_name = "NAME")]
    signals: Vec<String>,

    /// Frame poll timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Discovery,
    Logging,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Discovery => SessionMode::Discovery,
            ModeArg::Logging => SessionMode::Logging,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Monitor CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", can_monitor_core::VERSION);

    // Config file supplies defaults; command-line arguments win
    let file_config = match &args.config {
        Some(path) => Some(config::load_config(path)?),
        None => None,
    };

    let catalog_path = args
        .catalog
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.catalog.clone()));
    let Some(catalog_path) = catalog_path else {
        bail!("no catalog specified; pass --catalog <file.json> or --config <file.toml>");
    };

    let frames_path = args
        .frames
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.frames.clone()));
    let Some(frames_path) = frames_path else {
        bail!("no frame input specified; pass --frames <file.jsonl>");
    };

    let mode: SessionMode = args
        .mode
        .map(Into::into)
        .or_else(|| file_config.as_ref().map(|c| c.mode))
        .unwrap_or(SessionMode::Discovery);
    let output_dir = args
        .output
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("CAN_LOGS"));
    let signals = if !args.signals.is_empty() {
        Some(args.signals.clone())
    } else {
        file_config.as_ref().and_then(|c| c.signals.clone())
    };
    let timeout_ms = args
        .timeout_ms
        .or_else(|| file_config.as_ref().map(|c| c.timeout_ms))
        .unwrap_or(1000);

    // Build the session
    let catalog = catalog_file::load_catalog(&catalog_path)?;
    let stats = catalog.stats();
    println!(
        "Loaded catalog '{}': {} messages, {} signals",
        catalog.source(),
        stats.num_messages,
        stats.num_signals
    );

    let mut session_config =
        SessionConfig::new(mode, output_dir).with_poll_timeout_ms(timeout_ms);
    if let Some(signals) = signals {
        session_config = session_config.with_signal_filter(signals);
    }
    let mut session = SessionLoop::new(catalog, session_config);

    // Ctrl+C requests cooperative cancellation
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.trigger())?;
    }

    let mut source = catalog_file::load_frames(&frames_path)?;
    let mut observer = notify::ConsoleObserver;

    println!("Start receiving CAN data... (Press Ctrl+C to stop)");
    let summary = session.run(&mut source, &cancel, &mut observer)?;

    println!("\nSession stopped ({:?})", summary.stop_reason);
    println!("  Frames received:  {}", summary.frames_received);
    println!("  Frames decoded:   {}", summary.frames_decoded);
    println!("  Unique messages:  {}", summary.unique_messages);
    println!("  Rows logged:      {}", summary.rows_logged);
    println!("  Lookup misses:    {}", summary.lookup_misses);
    println!("  Decode errors:    {}", summary.decode_errors);

    match summary.flush {
        Ok(FlushOutcome::Written(files)) => {
            for file in files {
                println!("  Saved: {:?}", file);
            }
        }
        Ok(FlushOutcome::NothingToWrite) => println!("  No data received, nothing written."),
        Err(e) => {
            // Buffered data stays on the session object; report and fail
            eprintln!(
                "Flush failed ({}); {} rows and {} messages remain unsaved",
                e,
                session.rows().len(),
                session.inventory().len()
            );
            return Err(e.into());
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
