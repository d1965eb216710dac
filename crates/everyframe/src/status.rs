//! One-shot `status` and `reset` commands against the state file.

use std::path::Path;

use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::info;

use everyframe_catalog::FrameCatalog;
use everyframe_progress::ProgressStore;

use crate::config::parse_movie_specs;

/// Render a duration in seconds as `"H hours M minutes S seconds"`.
pub fn format_remaining(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{} hours {} minutes {} seconds", hours, minutes, seconds)
}

/// Print per-movie progress and the estimated time to finish each movie.
pub fn print_status(state_file: &Path, movie_specs: &[String], default_interval: u64) -> Result<()> {
    let movies = parse_movie_specs(movie_specs)?;
    let store = ProgressStore::load(state_file, default_interval)
        .into_diagnostic()
        .wrap_err("failed to load progress state")?;
    let catalog = FrameCatalog::scan(&movies);

    println!("state file: {}", state_file.display());
    println!("posting interval: {} seconds", store.tweet_delay());
    println!("current movie: {}", store.current_movie());

    for movie in &movies {
        let cursor = store.current_frame(movie.id);
        let total = catalog.total_frames(movie.id);
        let remaining_frames = total.saturating_sub(cursor.saturating_sub(1) as usize);
        let eta = remaining_frames as u64 * store.tweet_delay();

        println!(
            "  [{}] {}: next frame {} of {} ({} remaining, ~{})",
            movie.id,
            movie.name,
            cursor,
            total,
            remaining_frames,
            format_remaining(eta)
        );
    }

    Ok(())
}

/// Rewind every cursor to the start and persist immediately.
pub fn reset_state(state_file: &Path, default_interval: u64) -> Result<()> {
    let mut store = ProgressStore::load(state_file, default_interval)
        .into_diagnostic()
        .wrap_err("failed to load progress state")?;

    store.reset();
    store
        .persist()
        .into_diagnostic()
        .wrap_err("failed to persist reset state")?;

    info!(path = %state_file.display(), "progress state reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_zero() {
        assert_eq!(format_remaining(0), "0 hours 0 minutes 0 seconds");
    }

    #[test]
    fn formats_mixed_duration() {
        // 2h 5m 9s
        assert_eq!(format_remaining(7509), "2 hours 5 minutes 9 seconds");
    }

    #[test]
    fn formats_exact_hours() {
        assert_eq!(format_remaining(7200), "2 hours 0 minutes 0 seconds");
    }

    #[test]
    fn reset_rewinds_persisted_cursors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"tweetDelay": 60, "currentMovie": 2, "currentFrame_1": 500}"#,
        )
        .unwrap();

        reset_state(&path, 1800).unwrap();

        let store = ProgressStore::load(&path, 1800).unwrap();
        assert_eq!(store.current_movie(), 1);
        assert_eq!(store.current_frame(1), 1);
        // The stored interval survives a reset.
        assert_eq!(store.tweet_delay(), 60);
    }
}
