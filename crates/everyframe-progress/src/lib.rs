//! Durable posting-progress state for everyframe.
//!
//! This crate owns the state file that lets the bot resume exactly where it
//! left off across restarts: the posting interval, the active movie, and a
//! per-movie cursor for the next frame to post. The file is plain JSON so a
//! human can hand-edit it to recover or seek.

mod error;
mod store;

pub use error::StoreError;
pub use store::{ProgressState, ProgressStore};
