//! Chatline CLI and REST API entry point.
//!
//! Binary name: `chatline`
//!
//! Parses CLI arguments, initializes tracing, the database and services,
//! then dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, UserCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default filter by verbosity; RUST_LOG overrides
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn,chatline=info,chatline_core=info,chatline_api=info",
        1 => "info,chatline_core=debug,chatline_infra=debug,chatline_api=debug",
        _ => "trace",
    };
    chatline_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "chatline", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = run(&cli, &state).await;

    state.shutdown().await;
    chatline_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: &Cli, state: &AppState) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} Chatline API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!(
                    "  {}",
                    console::style(format!("Data directory: {}", state.data_dir.display())).dim()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            tracing::info!(%addr, models = state.chat_service.models().len(), "Server starting");

            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("Server stopped, draining in-flight generations");
        }

        Commands::User { command } => match command {
            UserCommand::Add { email, key_name } => {
                cli::user::add_user(state, email, key_name, cli.json).await?;
            }
            UserCommand::Guest => {
                cli::user::add_guest(state, cli.json).await?;
            }
            UserCommand::Key { email, key_name } => {
                cli::user::issue_key(state, email, key_name, cli.json).await?;
            }
        },

        Commands::Models { check } => {
            cli::models::list_models(state, cli.json, *check).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
