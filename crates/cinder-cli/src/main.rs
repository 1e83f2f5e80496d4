//! Cinder Binary
//!
//! ```bash
//! cinder hash --variant s notes.txt
//! cinder encrypt --key $KEY --nonce $NONCE plain.bin sealed.bin
//! echo 'hunter2' | cinder password hash --user alice
//! ```

use cinder_cli::{commands, parse_level, CinderConfig, Command};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

/// Cinder - BLAKE2, ChaCha20-Poly1305, PBKDF2/HKDF and PCG32 from the command line
#[derive(Parser, Debug)]
#[command(name = "cinder")]
#[command(version)]
#[command(about = "Hashing, authenticated encryption, key derivation and shuffling")]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CinderConfig::load_from_file(path)?,
        None => CinderConfig::default(),
    };

    // Initialize logging
    let level_name = args.log_level.as_deref().unwrap_or(&config.log_level);
    let level = parse_level(level_name).unwrap_or(tracing::Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    if let Some(path) = &args.config {
        info!("Loaded configuration from: {}", path.display());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(args.command, &config, &mut input, &mut out)?;
    Ok(())
}
