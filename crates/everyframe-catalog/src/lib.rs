//! Frame catalog for everyframe.
//!
//! Maps (movie id, frame number) to an on-disk image path by scanning each
//! movie's source directory. Frames may be authored incrementally, so the
//! catalog never assumes a fixed total: `rescan_movie` re-reads a movie's
//! directories to pick up newly added files mid-run.

mod catalog;

pub use catalog::{FrameCatalog, MovieId, MovieSource};
