//! modhost - watching host demo
//!
//! A minimal embedding of the mod-management core: it registers the search
//! directories given on the command line (or in `modhost-data/modhost.yaml`),
//! keeps them refreshed, and logs every mod event until interrupted.
//!
//! # Execution Flow
//!
//! 1. Load settings from modhost-data/modhost.yaml (defaults if absent)
//! 2. Initialize logging → logs/modhost.<date>
//! 3. Create tokio runtime with 4 worker threads
//! 4. Create the ModManager with a no-op host
//! 5. Register search directories and start the refresh timer
//! 6. Tick the manager from the main thread until Ctrl-C
//! 7. Dispose the manager and shut the runtime down

use anyhow::Result;
use camino::Utf8Path;
use modhost::{APP_NAME, ConfigManager, ModManager, NullHost, VERSION};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::error::TryRecvError;

fn main() -> Result<()> {
    // Settings are read before logging so the configured level applies.
    let config_manager = ConfigManager::new("modhost-data")?;
    let settings = config_manager.load_settings()?;

    let _guard =
        modhost::logging::setup_logging_with_console("logs", "modhost", &settings.log_level, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("modhost-worker")
        .build()?;

    let mut manager = ModManager::new(
        Arc::new(NullHost),
        settings.clone(),
        runtime.handle().clone(),
    );
    let mut events = manager.subscribe();

    let mut directories: Vec<String> = std::env::args().skip(1).collect();
    if directories.is_empty() {
        directories = settings
            .search_directories
            .iter()
            .map(|path| path.to_string())
            .collect();
    }
    anyhow::ensure!(
        !directories.is_empty(),
        "no search directories given (arguments or modhost.yaml)"
    );

    for directory in &directories {
        match manager.add_search_directory(Utf8Path::new(directory)) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("{} given more than once", directory),
            Err(err) => tracing::error!("cannot watch {}: {err:#}", directory),
        }
    }

    if settings.refresh_interval_secs > 0 {
        manager.set_refresh_interval(Some(std::time::Duration::from_secs(
            settings.refresh_interval_secs,
        )));
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                running.store(false, Ordering::SeqCst);
            }
        });
    }

    // The main thread is the consumer context.
    while running.load(Ordering::SeqCst) {
        manager.update();
        loop {
            match events.try_recv() {
                Ok(event) => tracing::info!("event: {:?}", event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("event subscriber lagged, {skipped} events dropped");
                }
                Err(_) => break,
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(150));
    }

    tracing::info!("shutting down");
    manager.dispose();
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    Ok(())
}
