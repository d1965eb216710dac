//! Progress state and its durable store.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::StoreError;

/// Posting progress: interval, active movie, and per-movie frame cursors.
///
/// Serialized field names match the original state file so it stays
/// hand-editable: `tweetDelay`, `currentMovie`, `currentFrame_<movieId>`.
/// The frame cursor is always the *next* frame to post, never one already
/// confirmed posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Seconds between posts; also the slot grid interval.
    #[serde(rename = "tweetDelay")]
    pub tweet_delay: u64,

    /// Active movie id (1-based, only ever increases).
    #[serde(rename = "currentMovie", default = "default_one")]
    pub current_movie: u32,

    /// `currentFrame_<movieId>` entries, flattened into the top level.
    #[serde(flatten)]
    frames: BTreeMap<String, u32>,
}

fn default_one() -> u32 {
    1
}

fn frame_key(movie: u32) -> String {
    format!("currentFrame_{}", movie)
}

impl ProgressState {
    /// Fresh state: movie 1, every cursor at frame 1.
    pub fn new(tweet_delay: u64) -> Self {
        Self {
            tweet_delay,
            current_movie: 1,
            frames: BTreeMap::new(),
        }
    }

    /// Cursor for a movie: the next frame to post (defaults to 1).
    pub fn current_frame(&self, movie: u32) -> u32 {
        self.frames.get(&frame_key(movie)).copied().unwrap_or(1)
    }

    /// Advance a movie's cursor by exactly one.
    pub fn advance_frame(&mut self, movie: u32) -> u32 {
        let next = self.current_frame(movie) + 1;
        self.frames.insert(frame_key(movie), next);
        next
    }

    /// Move to the next movie and start it from frame 1.
    pub fn advance_movie(&mut self) -> u32 {
        self.current_movie += 1;
        self.frames.insert(frame_key(self.current_movie), 1);
        self.current_movie
    }

    /// Restore movie 1 and every known cursor to frame 1.
    pub fn reset(&mut self) {
        self.current_movie = 1;
        for cursor in self.frames.values_mut() {
            *cursor = 1;
        }
    }
}

/// Durable store wrapping a [`ProgressState`] and its file on disk.
///
/// Mutations happen in memory; [`persist`](ProgressStore::persist) writes the
/// whole state atomically (temp file in the same directory, then rename) and
/// only when it differs from the last-persisted snapshot.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    state: ProgressState,
    last_persisted: Option<ProgressState>,
}

impl ProgressStore {
    /// Load state from `path`, defaulting every missing field.
    ///
    /// An absent file yields fresh state seeded with `default_delay`; the
    /// first persist creates it. A present-but-corrupt file is an error so
    /// that progress is never silently clobbered.
    pub fn load(path: impl Into<PathBuf>, default_delay: u64) -> Result<Self, StoreError> {
        let path = path.into();

        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let state: ProgressState = serde_json::from_str(&contents)?;
                info!(
                    path = %path.display(),
                    tweet_delay = state.tweet_delay,
                    current_movie = state.current_movie,
                    "loaded progress state"
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no state file, starting fresh");
                ProgressState::new(default_delay)
            }
            Err(e) => return Err(e.into()),
        };

        let last_persisted = Some(state.clone()).filter(|_| path.exists());
        Ok(Self {
            path,
            state,
            last_persisted,
        })
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn tweet_delay(&self) -> u64 {
        self.state.tweet_delay
    }

    pub fn current_movie(&self) -> u32 {
        self.state.current_movie
    }

    pub fn current_frame(&self, movie: u32) -> u32 {
        self.state.current_frame(movie)
    }

    pub fn advance_frame(&mut self, movie: u32) -> u32 {
        self.state.advance_frame(movie)
    }

    pub fn advance_movie(&mut self) -> u32 {
        self.state.advance_movie()
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Whether the in-memory state differs from the last-persisted snapshot.
    pub fn is_dirty(&self) -> bool {
        self.last_persisted.as_ref() != Some(&self.state)
    }

    /// Write the full state atomically if dirty.
    ///
    /// Returns `Ok(true)` if a write happened, `Ok(false)` if the state was
    /// already persisted. On error the in-memory state remains authoritative
    /// and a later persist retries; callers log and continue.
    pub fn persist(&mut self) -> Result<bool, StoreError> {
        if !self.is_dirty() {
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(&self.state)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(&self.path)?;

        self.last_persisted = Some(self.state.clone());
        debug!(path = %self.path.display(), "persisted progress state");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("state.json")
    }

    #[test]
    fn absent_file_defaults_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::load(state_path(&dir), 1800).unwrap();

        assert_eq!(store.tweet_delay(), 1800);
        assert_eq!(store.current_movie(), 1);
        assert_eq!(store.current_frame(1), 1);
        assert_eq!(store.current_frame(7), 1);
    }

    #[test]
    fn persists_and_reloads_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let mut store = ProgressStore::load(&path, 30).unwrap();
        store.advance_frame(1);
        store.advance_frame(1);
        store.persist().unwrap();

        let reloaded = ProgressStore::load(&path, 999).unwrap();
        // Stored delay wins over the config default on reload.
        assert_eq!(reloaded.tweet_delay(), 30);
        assert_eq!(reloaded.current_frame(1), 3);
        assert_eq!(reloaded.current_movie(), 1);
    }

    #[test]
    fn persist_skips_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::load(state_path(&dir), 30).unwrap();

        assert!(store.is_dirty()); // no file on disk yet
        assert!(store.persist().unwrap());
        assert!(!store.is_dirty());
        assert!(!store.persist().unwrap());

        store.advance_frame(1);
        assert!(store.is_dirty());
        assert!(store.persist().unwrap());
    }

    #[test]
    fn state_file_is_hand_editable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(
            &path,
            r#"{"tweetDelay": 60, "currentMovie": 2, "currentFrame_1": 500, "currentFrame_2": 42}"#,
        )
        .unwrap();

        let store = ProgressStore::load(&path, 30).unwrap();
        assert_eq!(store.tweet_delay(), 60);
        assert_eq!(store.current_movie(), 2);
        assert_eq!(store.current_frame(1), 500);
        assert_eq!(store.current_frame(2), 42);
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(&path, r#"{"tweetDelay": 60}"#).unwrap();

        let store = ProgressStore::load(&path, 30).unwrap();
        assert_eq!(store.current_movie(), 1);
        assert_eq!(store.current_frame(1), 1);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            ProgressStore::load(&path, 30),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn reset_restores_all_cursors() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::load(state_path(&dir), 30).unwrap();

        store.advance_frame(1);
        store.advance_frame(2);
        store.advance_movie();
        store.reset();

        assert_eq!(store.current_movie(), 1);
        assert_eq!(store.current_frame(1), 1);
        assert_eq!(store.current_frame(2), 1);
    }

    #[test]
    fn advance_movie_starts_next_from_frame_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);
        std::fs::write(
            &path,
            r#"{"tweetDelay": 60, "currentMovie": 1, "currentFrame_1": 4, "currentFrame_2": 9}"#,
        )
        .unwrap();

        let mut store = ProgressStore::load(&path, 60).unwrap();
        assert_eq!(store.advance_movie(), 2);
        // A stale hand-edited cursor for the new movie is overwritten.
        assert_eq!(store.current_frame(2), 1);
        // The finished movie's cursor is untouched.
        assert_eq!(store.current_frame(1), 4);
    }

    #[test]
    fn cursor_only_moves_forward_by_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProgressStore::load(state_path(&dir), 30).unwrap();

        let mut previous = store.current_frame(1);
        for _ in 0..10 {
            let next = store.advance_frame(1);
            assert_eq!(next, previous + 1);
            previous = next;
        }
    }

    #[test]
    fn written_file_keeps_original_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(&dir);

        let mut store = ProgressStore::load(&path, 1800).unwrap();
        store.advance_frame(1);
        store.persist().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("tweetDelay"));
        assert!(contents.contains("currentMovie"));
        assert!(contents.contains("currentFrame_1"));
    }
}
