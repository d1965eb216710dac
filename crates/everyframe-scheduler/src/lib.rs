//! Grid-aligned posting-slot scheduler for everyframe.
//!
//! Posts happen on a fixed time grid: multiples of the configured interval
//! counted from the Unix epoch (which is UTC-midnight aligned). After each
//! post the target advances by exactly one interval rather than being
//! recomputed from "now", so fractional-second drift never accumulates.
//! When the process falls more than one interval behind it resynchronizes
//! to the grid instead of firing a burst of catch-up posts.

mod scheduler;

pub use scheduler::{SlotScheduler, WaitOutcome};
