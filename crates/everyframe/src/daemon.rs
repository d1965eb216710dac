//! Daemon assembly: wire the catalog, store, scheduler, poster, and
//! notifier together, run the engine, and persist on the way out.

use chrono::Utc;
use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::sync::watch;
use tracing::{error, info};

use everyframe_catalog::FrameCatalog;
use everyframe_notify::{EmailNotifier, NoopNotifier, Notify};
use everyframe_poster::{PlatformClient, Poster};
use everyframe_progress::ProgressStore;
use everyframe_scheduler::SlotScheduler;

use crate::config::Config;
use crate::engine::ProgressionEngine;

pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        movies = config.movies.len(),
        state_file = %config.state_file.display(),
        "starting everyframe"
    );

    let mut store = ProgressStore::load(&config.state_file, config.interval)
        .into_diagnostic()
        .wrap_err("failed to load progress state")?;

    if config.reset {
        info!("resetting progress state before starting");
        store.reset();
        store
            .persist()
            .into_diagnostic()
            .wrap_err("failed to persist reset state")?;
    }

    let catalog = FrameCatalog::scan(&config.movies);
    for movie in &config.movies {
        info!(
            movie = movie.id,
            name = %movie.name,
            frames = catalog.total_frames(movie.id),
            "catalogued movie"
        );
    }

    // The stored interval is authoritative once a state file exists; the
    // config value only seeds a fresh one.
    let scheduler = SlotScheduler::new(store.tweet_delay(), Utc::now());

    let client = PlatformClient::new(&config.platform_url, &config.platform_token);
    let poster = Poster::new(client, config.hashtags.clone());

    let notifier: Box<dyn Notify> = match &config.email {
        Some(email) => Box::new(EmailNotifier::new(
            &email.api_url,
            &email.api_key,
            &email.from,
            &email.to,
        )),
        None => Box::new(NoopNotifier),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx);

    let engine = ProgressionEngine::new(
        config.movies,
        catalog,
        store,
        scheduler,
        poster,
        notifier,
        config.cooldown,
        shutdown_rx,
    );

    let mut store = engine.run().await;
    if let Err(e) = store.persist() {
        error!(error = %e, "failed to persist progress state on shutdown");
    }

    info!("everyframe stopped");
    Ok(())
}

/// Flip the shutdown flag on the first Ctrl-C or SIGTERM.
fn spawn_signal_listener(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received, finishing current cycle");
        let _ = shutdown_tx.send(true);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler, Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
