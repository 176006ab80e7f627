mod cli;
mod commands;
mod config;
mod logging;
mod modal;
mod model;
mod remote;
mod storage;
mod tasks;
mod ui;
mod urgency;
mod view;
mod workflow;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::Config::from_cli(&args)?;
    let _log_guard = logging::init(config.debug, &config.data_dir);
    tracing::info!(server = %config.server, "starting noteline");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let command = args.command.unwrap_or(cli::Command::Tui);
    runtime.block_on(async {
        match command {
            cli::Command::Tui => commands::tui(&config).await,
            cli::Command::List { query } => commands::list(&config, query).await,
            cli::Command::Add { text, deadline } => commands::add(&config, text, deadline).await,
            cli::Command::Edit {
                note_id,
                text,
                deadline,
                clear_deadline,
            } => commands::edit(&config, note_id, text, deadline, clear_deadline).await,
            cli::Command::Delete { note_id, yes } => {
                commands::delete(&config, note_id, yes).await
            }
            cli::Command::Export { query } => commands::export(&config, query).await,
            cli::Command::Theme { theme } => commands::theme(theme),
        }
    })
}
