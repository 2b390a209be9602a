//! The observation window: consume events until the deadline, then rank.

use std::path::PathBuf;

use tokio::time::Instant;

use crate::attribution::{AccumulatedBytes, AttributionEngine};
use crate::fanotify::{self, EventSource};
use crate::procfs::CounterReader;

/// One line of the final ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub path: PathBuf,
    pub bytes: u64,
}

impl std::fmt::Display for ReportRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:.2} kB",
            self.path.display(),
            self.bytes as f64 / 1024.0
        )
    }
}

/// The top entries of a finished window, largest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Ranks `accumulated` and keeps at most `top` rows.
    pub fn from_accumulated(accumulated: &AccumulatedBytes, top: usize) -> Self {
        let rows = accumulated
            .top(top)
            .into_iter()
            .map(|(path, bytes)| ReportRow {
                path: path.to_path_buf(),
                bytes,
            })
            .collect();
        Self { rows }
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.rows.iter().map(ToString::to_string)
    }
}

/// Feeds events from `source` into `engine` until `deadline`.
///
/// The deadline interrupts a pending wait for the next event, and a deadline
/// that has already passed consumes nothing. Returns the number of events
/// consumed.
///
/// # Errors
///
/// Returns the first channel error; the run must not continue past it.
pub async fn observe<S, C>(
    source: &mut S,
    engine: &mut AttributionEngine<C>,
    deadline: Instant,
) -> fanotify::Result<usize>
where
    S: EventSource,
    C: CounterReader,
{
    let remaining = deadline.saturating_duration_since(Instant::now());
    let deadline = tokio::time::sleep_until(deadline);
    tokio::pin!(deadline);
    let mut consumed = 0;

    log::debug!("Observing writes for another {remaining:?}");
    loop {
        tokio::select! {
            biased;
            () = &mut deadline => break,
            event = source.next_event() => {
                engine.attribute(event?);
                consumed += 1;
            }
        }
    }
    log::debug!(
        "Window closed after {consumed} events, {} files",
        engine.accumulated().len()
    );

    Ok(consumed)
}
