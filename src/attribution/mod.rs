//! Attribution of write events to files.
//!
//! For every [`ChangeEvent`](crate::fanotify::ChangeEvent) the originating
//! process's write counter is sampled and the growth since its previous
//! sample is credited to the changed file. The per-process table and the
//! per-file totals are owned by a single [`AttributionEngine`].
mod accumulator;
mod engine;

pub use accumulator::AccumulatedBytes;
pub use engine::{Attribution, AttributionEngine, ProcessCounterTable};
