//! portunus-orchestrator - entry point
//!
//! Reads its configuration from PORTUNUS_* environment variables, prepares
//! the state directories, starts slapd and then runs portunus-server in the
//! foreground. Exits non-zero if anything fails.

use std::process::ExitCode;

use clap::Parser;

use portunus::config::Config;
use portunus::OrchestratorError;

#[derive(Parser)]
#[command(name = "portunus-orchestrator")]
#[command(about = "Bootstraps slapd and supervises portunus-server")]
#[command(
    long_about = "portunus-orchestrator must run as root. It prepares the state \
    directories of slapd and portunus-server, renders slapd.conf, starts slapd \
    in the background and runs portunus-server in the foreground. \
    Configuration is read from PORTUNUS_* environment variables."
)]
struct Args {
    /// Print the rendered slapd.conf and exit without touching the filesystem
    #[arg(long, short = 'n')]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // the debug flag decides the log level, so read the config first
    let config = Config::from_env();
    let default_filter = match &config {
        Ok(c) if c.debug => "debug",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => return fatal(e.into()),
    };

    if args.dry_run {
        return match portunus::write_rendered_config(&config, &mut std::io::stdout()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fatal(e),
        };
    }

    if !nix::unistd::geteuid().is_root() {
        log::warn!("Not running as root; changing file ownership will likely fail");
    }

    match portunus::run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(e),
    }
}

fn fatal(err: OrchestratorError) -> ExitCode {
    log::error!("{}", err);
    ExitCode::FAILURE
}
