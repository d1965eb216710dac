//! Frame catalog implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Identifier for a configured movie (1-based).
pub type MovieId = u32;

/// Accepted image extensions (lowercased for comparison).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A configured movie: an id, a caption tag, and a source directory.
///
/// The directory contains frame files either directly or split across one
/// level of batch subfolders. Batching is an authoring convenience; the
/// catalog flattens it into a single integer keyspace per movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieSource {
    pub id: MovieId,
    /// Display name used in captions.
    pub name: String,
    pub root: PathBuf,
}

/// In-memory index from (movie id, frame number) to file path.
#[derive(Debug, Default)]
pub struct FrameCatalog {
    movies: BTreeMap<MovieId, BTreeMap<u32, PathBuf>>,
}

impl FrameCatalog {
    /// Build a catalog by scanning every configured movie directory.
    ///
    /// A missing or unreadable directory yields an empty movie, not an
    /// error; the progression engine treats zero frames as "nothing to
    /// post yet".
    pub fn scan(sources: &[MovieSource]) -> Self {
        let mut catalog = Self::default();
        for source in sources {
            catalog.rescan_movie(source);
        }
        catalog
    }

    /// Re-scan a single movie's directories, replacing its index.
    ///
    /// Idempotent; invoked at the top of each posting cycle so frames
    /// authored after startup are picked up.
    pub fn rescan_movie(&mut self, source: &MovieSource) {
        let mut frames = BTreeMap::new();

        let entries = match fs::read_dir(&source.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    movie = source.id,
                    root = %source.root.display(),
                    error = %e,
                    "movie directory unreadable, treating as empty"
                );
                self.movies.insert(source.id, frames);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                // One level of batch subfolders.
                match fs::read_dir(&path) {
                    Ok(batch) => {
                        for file in batch.flatten() {
                            index_frame_file(source.id, &file.path(), &mut frames);
                        }
                    }
                    Err(e) => {
                        warn!(
                            movie = source.id,
                            batch = %path.display(),
                            error = %e,
                            "batch subfolder unreadable, skipping"
                        );
                    }
                }
            } else {
                index_frame_file(source.id, &path, &mut frames);
            }
        }

        debug!(
            movie = source.id,
            frames = frames.len(),
            "scanned movie directory"
        );
        self.movies.insert(source.id, frames);
    }

    /// Number of distinct frames known for a movie.
    pub fn total_frames(&self, movie: MovieId) -> usize {
        self.movies.get(&movie).map(BTreeMap::len).unwrap_or(0)
    }

    /// Resolve a frame to its file path, if present.
    ///
    /// Frame numbers need not be contiguous; a missing number is a
    /// legitimate not-found, reported as `None`.
    pub fn locate(&self, movie: MovieId, frame: u32) -> Option<&Path> {
        self.movies
            .get(&movie)?
            .get(&frame)
            .map(PathBuf::as_path)
    }

    /// Highest frame number known for a movie, if any.
    pub fn max_frame(&self, movie: MovieId) -> Option<u32> {
        self.movies
            .get(&movie)
            .and_then(|frames| frames.keys().next_back().copied())
    }
}

/// Parse `frame_<n>.<ext>` and insert into the index.
///
/// Files that don't match the convention are ignored. The first occurrence
/// of a frame number wins when batch folders overlap.
fn index_frame_file(movie: MovieId, path: &Path, frames: &mut BTreeMap<u32, PathBuf>) {
    let Some(number) = parse_frame_number(path) else {
        debug!(movie, file = %path.display(), "ignoring non-frame file");
        return;
    };

    if frames.contains_key(&number) {
        warn!(
            movie,
            frame = number,
            file = %path.display(),
            "duplicate frame number across batch folders, keeping first"
        );
        return;
    }
    frames.insert(number, path.to_path_buf());
}

/// Extract the frame number from a `frame_<n>.<ext>` filename.
fn parse_frame_number(path: &Path) -> Option<u32> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("frame_")?;
    digits.parse().ok()
}
