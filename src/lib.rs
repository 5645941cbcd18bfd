pub mod db;
pub mod format;
pub mod models;
pub mod settings;
pub mod store;
pub mod timer;
mod utils;

use std::{io::Write, sync::Arc};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use db::Database;
use settings::{default_settings_path, HistoryBackend, SettingsStore};
use store::{HistoryStore, MemoryHistoryStore};
use timer::{
    commands::{execute, Command},
    FastController, SystemClock,
};

const ENABLE_LOGS: bool = true;

/// Builds the history store the settings ask for.
pub fn open_history_store(settings: &SettingsStore) -> Result<Arc<dyn HistoryStore>> {
    match settings.settings().history_backend {
        HistoryBackend::Memory => Ok(Arc::new(MemoryHistoryStore::new())),
        HistoryBackend::Sqlite => {
            let database = Database::new(settings.database_path())?;
            log_info!("Persisting history to {}", database.path().display());
            Ok(Arc::new(database))
        }
    }
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Fastway starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let settings_path = default_settings_path()?;
    let settings = SettingsStore::new(settings_path)?;
    if settings.write_defaults_if_missing()? {
        log_info!("Wrote default settings to {}", settings.path().display());
    }
    let store = open_history_store(&settings)?;

    let controller = FastController::new(
        store,
        Arc::new(SystemClock),
        settings.settings().tick_interval(),
    );
    controller.load_history().await?;

    println!("{}", timer::commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match execute(&controller, command).await {
            Ok(output) => println!("{output}"),
            Err(err) => {
                log_error!("Command '{}' failed: {}", line.trim(), err);
                println!("error: {err}");
            }
        }
    }

    controller.shutdown().await;
    log::info!("Fastway shutting down");
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
