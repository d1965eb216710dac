//! The progression engine: one posting cycle per scheduled slot.
//!
//! Each cycle resolves the active movie's cursor against the catalog, waits
//! for the slot, posts (or skips) exactly one frame, persists progress, and
//! advances the slot grid. The engine owns the decision of when a slot is
//! consumed: posts and skips consume one, idling and movie rollover do not
//! post but still follow their own slot rules, and faults pause then resync.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use everyframe_catalog::{FrameCatalog, MovieId, MovieSource};
use everyframe_notify::Notify;
use everyframe_poster::{FramePoster, PostOutcome};
use everyframe_progress::ProgressStore;
use everyframe_scheduler::{SlotScheduler, WaitOutcome};

use crate::status::format_remaining;

/// Why a frame was skipped instead of posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cursor's frame number has no file in the catalog.
    MissingFrame,
    /// The platform rejected the post as duplicate content.
    Duplicate,
    /// The caption exceeded the platform's length limit.
    OverLength,
}

impl SkipReason {
    fn describe(&self) -> &'static str {
        match self {
            SkipReason::MissingFrame => "frame file missing from catalog",
            SkipReason::Duplicate => "platform rejected duplicate content",
            SkipReason::OverLength => "caption over platform length limit",
        }
    }
}

/// What one cycle of the engine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame went out; its slot is consumed.
    Posted { movie: MovieId, frame: u32 },
    /// A frame was skipped with an alert; its slot is consumed.
    Skipped {
        movie: MovieId,
        frame: u32,
        reason: SkipReason,
    },
    /// The active movie has no frames yet; one slot passed idle.
    Idle { movie: MovieId },
    /// The active movie's frames ran out; moved to the next movie without
    /// consuming a slot.
    MovieComplete { finished: MovieId, next: MovieId },
    /// Every configured movie is complete.
    AllComplete,
    /// Shutdown was requested.
    ShutdownRequested,
    /// An unexpected posting failure; cooled down and resynced, the same
    /// frame will be retried next cycle.
    Faulted { movie: MovieId, frame: u32 },
}

/// Drives the whole posting loop over injected collaborators.
pub struct ProgressionEngine<P, N> {
    movies: Vec<MovieSource>,
    catalog: FrameCatalog,
    store: ProgressStore,
    scheduler: SlotScheduler,
    poster: P,
    notifier: N,
    cooldown: Duration,
    shutdown_rx: watch::Receiver<bool>,
    completion_notified: bool,
}

impl<P: FramePoster, N: Notify> ProgressionEngine<P, N> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        movies: Vec<MovieSource>,
        catalog: FrameCatalog,
        store: ProgressStore,
        scheduler: SlotScheduler,
        poster: P,
        notifier: N,
        cooldown: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            movies,
            catalog,
            store,
            scheduler,
            poster,
            notifier,
            cooldown,
            shutdown_rx,
            completion_notified: false,
        }
    }

    /// Run cycles until every movie is complete or shutdown is requested,
    /// then hand the store back for a final persist.
    pub async fn run(mut self) -> ProgressStore {
        loop {
            match self.cycle().await {
                CycleOutcome::AllComplete => {
                    info!("all movies complete, stopping");
                    break;
                }
                CycleOutcome::ShutdownRequested => {
                    info!("shutdown requested, stopping");
                    break;
                }
                _ => {}
            }
        }
        self.store
    }

    /// One cycle: resolve the cursor, wait for the slot, post or skip one
    /// frame, persist, advance.
    pub async fn cycle(&mut self) -> CycleOutcome {
        if *self.shutdown_rx.borrow() {
            return CycleOutcome::ShutdownRequested;
        }

        let movie = self.store.current_movie();
        let Some(source) = self.movies.iter().find(|m| m.id == movie).cloned() else {
            return self.complete_all().await;
        };

        // Frames authored after startup are picked up each cycle.
        self.catalog.rescan_movie(&source);
        let total = self.catalog.total_frames(movie);

        if total == 0 {
            warn!(movie, name = %source.name, "no frames in catalog, idling one slot");
            if self.wait_for_slot().await == WaitOutcome::ShutdownRequested {
                return CycleOutcome::ShutdownRequested;
            }
            self.scheduler.advance();
            return CycleOutcome::Idle { movie };
        }

        let frame = self.store.current_frame(movie);
        let max_frame = self.catalog.max_frame(movie).unwrap_or(0);
        if frame > max_frame {
            return self.roll_over(movie).await;
        }

        if self.wait_for_slot().await == WaitOutcome::ShutdownRequested {
            return CycleOutcome::ShutdownRequested;
        }

        let Some(path) = self.catalog.locate(movie, frame).map(|p| p.to_path_buf()) else {
            return self
                .skip(movie, &source.name, frame, SkipReason::MissingFrame)
                .await;
        };

        match self
            .poster
            .post_frame(&path, &source.name, frame, total)
            .await
        {
            Ok(PostOutcome::Posted | PostOutcome::PostedTextOnly) => {
                self.store.advance_frame(movie);
                self.persist_progress();
                self.scheduler.advance();
                // Rate-limit pauses and backoff inside post_frame can stall
                // past the interval; snap back to the grid rather than
                // firing the missed slots back-to-back.
                self.scheduler.resync(Utc::now());

                let remaining_frames = total.saturating_sub(frame as usize) as u64;
                let remaining_secs = remaining_frames * self.store.tweet_delay();
                info!(
                    movie,
                    frame,
                    total,
                    remaining = %format_remaining(remaining_secs),
                    "frame posted"
                );
                CycleOutcome::Posted { movie, frame }
            }

            Ok(PostOutcome::SkippedDuplicate) => {
                self.skip(movie, &source.name, frame, SkipReason::Duplicate)
                    .await
            }

            Ok(PostOutcome::SkippedOverLength) => {
                self.skip(movie, &source.name, frame, SkipReason::OverLength)
                    .await
            }

            Err(e) => {
                error!(movie, frame, error = %e, "posting failed, cooling down");
                self.notifier
                    .send(
                        "Posting error",
                        &format!(
                            "Posting frame {} of {} failed: {}\nPausing {} seconds before resuming.",
                            frame,
                            source.name,
                            e,
                            self.cooldown.as_secs()
                        ),
                    )
                    .await;

                tokio::select! {
                    _ = tokio::time::sleep(self.cooldown) => {}
                    _ = self.shutdown_rx.changed() => {
                        if *self.shutdown_rx.borrow() {
                            return CycleOutcome::ShutdownRequested;
                        }
                    }
                }
                self.scheduler.resync(Utc::now());
                CycleOutcome::Faulted { movie, frame }
            }
        }
    }

    async fn wait_for_slot(&mut self) -> WaitOutcome {
        self.scheduler.wait_until_due(&mut self.shutdown_rx).await
    }

    /// Skip the cursor's frame: alert, advance, persist, consume the slot.
    async fn skip(
        &mut self,
        movie: MovieId,
        name: &str,
        frame: u32,
        reason: SkipReason,
    ) -> CycleOutcome {
        warn!(movie, frame, reason = reason.describe(), "skipping frame");
        self.notifier
            .send(
                "Frame skipped",
                &format!(
                    "Frame {} of {} was skipped: {}.",
                    frame,
                    name,
                    reason.describe()
                ),
            )
            .await;

        self.store.advance_frame(movie);
        self.persist_progress();
        self.scheduler.advance();
        self.scheduler.resync(Utc::now());
        CycleOutcome::Skipped {
            movie,
            frame,
            reason,
        }
    }

    /// The active movie ran out of frames. Move on without consuming a
    /// slot so the next movie's first frame goes out on schedule.
    async fn roll_over(&mut self, finished: MovieId) -> CycleOutcome {
        if !self.movies.iter().any(|m| m.id == finished + 1) {
            return self.complete_all().await;
        }

        let next = self.store.advance_movie();
        self.persist_progress();
        info!(finished, next, "movie complete, moving to next movie");
        CycleOutcome::MovieComplete { finished, next }
    }

    /// Terminal state. The completion alert goes out once per run.
    async fn complete_all(&mut self) -> CycleOutcome {
        if !self.completion_notified {
            info!("every configured movie has been posted in full");
            self.notifier
                .send(
                    "All movies complete",
                    "Every configured movie has been posted in full. The daemon is stopping.",
                )
                .await;
            self.completion_notified = true;
        }
        self.persist_progress();
        CycleOutcome::AllComplete
    }

    /// Persist, logging failures. The in-memory state stays authoritative
    /// and the next persist retries.
    fn persist_progress(&mut self) {
        if let Err(e) = self.store.persist() {
            error!(error = %e, "failed to persist progress state");
        }
    }
}
