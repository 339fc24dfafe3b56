//! larigot Admin Binary
//!
//! Runs moderator console commands and maintenance against a data directory
//! while no server has it open. Opening fails if one does.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use larigot::board::{fingerprint, Identity};
use larigot::{Board, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// larigot administration
#[derive(Parser, Debug)]
#[command(name = "larigot-admin")]
#[command(about = "Administration for a larigot bulletin board")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./larigot_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one console command as the internal administrator
    Console {
        /// The command and its arguments, e.g. `mute alice 7`
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },

    /// Rebuild the keyword index from every stored post
    Reindex,

    /// Print the fingerprint of a DER-encoded certificate
    Fingerprint {
        /// Path of the certificate file
        cert: PathBuf,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,larigot=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    tracing::debug!("larigot-admin v{}", larigot::VERSION);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> larigot::Result<()> {
    if let Commands::Fingerprint { cert } = &args.command {
        let der = std::fs::read(cert)?;
        println!("{}", fingerprint(&der));
        return Ok(());
    }

    let config = Config::builder().data_dir(&args.data_dir).build();
    tracing::info!("Data directory: {}", args.data_dir.display());
    let board = Board::open(config)?;

    let result = match &args.command {
        Commands::Console { words } => board
            .console_command(&Identity::internal(), &words.join(" "))
            .map(|output| println!("{}", output)),
        Commands::Reindex => board.reindex().map(|count| {
            println!("Indexed {} posts", count);
        }),
        Commands::Fingerprint { .. } => Ok(()),
    };

    board.close()?;
    result
}
