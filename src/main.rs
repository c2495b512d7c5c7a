//! greenwave: adaptive traffic-signal control agent

use clap::Parser;

use greenwave::cli::args::Cli;
use greenwave::cli::commands;
use greenwave::error::ExitCode;
use greenwave::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = match &cli.command {
            greenwave::cli::args::Commands::Run(args) if args.log_json => LogFormat::Json,
            _ => LogFormat::Human,
        };
        init_logging(format, cli.verbose, cli.color);
    }

    // Force-exit watcher: the first signal triggers graceful shutdown in
    // the run command; a second one exits immediately.
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }

        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
