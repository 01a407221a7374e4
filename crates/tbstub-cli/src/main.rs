//! # tbstub CLI
//!
//! Operator helper for launching a host application under `libtbstub.so`.
//! It never spawns the host itself: `env` emits the environment a launcher
//! should apply, `doctor` checks an environment that is already applied.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tbstub_config::logging::{self, LogLevel};
use tbstub_config::{CONTROL_SOCKET_ENV, SOCKS_SOCKET_ENV};

mod doctor;
mod env;
mod library;

/// tbstub - confine a GUI application's network access to two AF_UNIX endpoints
#[derive(Parser)]
#[command(name = "tbstub")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a shell script exporting the preload environment
    Env(EnvArgs),

    /// Check the preload environment of the current shell
    Doctor {
        /// Preload library to check instead of searching for it
        #[arg(long, value_name = "PATH")]
        library: Option<PathBuf>,
    },
}

#[derive(Args)]
struct EnvArgs {
    /// Path of the AF_UNIX proxy (SOCKS) endpoint
    #[arg(long, value_name = "PATH", env = SOCKS_SOCKET_ENV)]
    socks: PathBuf,

    /// Path of the AF_UNIX control endpoint
    #[arg(long, value_name = "PATH", env = CONTROL_SOCKET_ENV)]
    control: PathBuf,

    /// Preload library (default: search next to this binary, ../lib, target/)
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();

    logging::init_logging(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    match cli.command {
        Commands::Env(args) => {
            env::cmd_env(&args.socks, &args.control, args.library.as_deref())
        }
        Commands::Doctor { library } => doctor::cmd_doctor(library.as_deref()),
    }
}
