//! episodeplay - episode playback session manager
//!
//! # Usage
//!
//! ```bash
//! episodeplay resolve-subs tracks.json
//! episodeplay select-server hd-1 hd-2 megacloud
//! episodeplay progress list --json
//! episodeplay replay session.json
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use episodeplay::cli::{Cli, Command, ExitCode, Output};
use episodeplay::commands;
use episodeplay::config::Config;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref());
    init_tracing(&config, cli.quiet);

    run_cli(cli, config).await.into()
}

/// Log to stderr so stdout stays parseable
fn init_tracing(config: &Config, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if quiet { "error" } else { config.log_filter() };
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);

    // Commands that never touch local storage
    match cli.command {
        Command::Replay(cmd) => return commands::replay_cmd(cmd, &config, &output),
        Command::Whoami(_) => return commands::whoami_cmd(&config, &output).await,
        _ => {}
    }

    let store = match commands::open_store(cli.store.as_deref(), &config) {
        Ok(store) => store,
        Err(e) => return output.error(format!("Cannot open store: {}", e), ExitCode::StorageError),
    };

    match cli.command {
        Command::ResolveSubs(cmd) => commands::resolve_subs_cmd(cmd, store, &output),
        Command::SelectServer(cmd) => commands::select_server_cmd(cmd, store, &output),
        Command::SwitchServer(cmd) => {
            commands::switch_server_cmd(cmd, store, &config, &output).await
        }
        Command::Progress(cmd) => commands::progress_cmd(cmd, store, &output),
        Command::Settings(cmd) => commands::settings_cmd(cmd, store, &output),
        Command::Replay(_) | Command::Whoami(_) => ExitCode::Success,
    }
}
