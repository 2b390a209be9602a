//! Per-process write counters from procfs.
//!
//! The counters come from `/proc/<pid>/io`. A process can exit at any moment
//! between listing and reading; readers report that as [`Error::NotFound`],
//! which callers treat as "no contribution".
mod counter;
mod error;
mod io;
mod parser;

pub use counter::{CounterReader, ProcessId, ProcfsCounterReader};
pub use error::{Error, Result, StatParseError};
pub use io::{IoCounterSnapshot, IoCounters};
pub use parser::{FieldHandler, KeyValueStat};
