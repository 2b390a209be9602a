//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use crate::fanotify::{
    self, ChangeEvent, EventFile, EventMask, EventMetadata, EventSource, METADATA_LEN,
    METADATA_VERSION,
};
use crate::procfs::{CounterReader, Error, IoCounterSnapshot, ProcessId, Result};

/// Counter values handed out per pid, one per read; the last value repeats.
#[derive(Debug, Default)]
pub(crate) struct ScriptedCounters {
    values: RefCell<HashMap<u32, VecDeque<u64>>>,
}

impl ScriptedCounters {
    pub(crate) fn with(pid: u32, values: &[u64]) -> Self {
        let counters = Self::default();
        counters.push(pid, values);
        counters
    }

    pub(crate) fn push(&self, pid: u32, values: &[u64]) {
        self.values
            .borrow_mut()
            .entry(pid)
            .or_default()
            .extend(values.iter().copied());
    }
}

impl CounterReader for ScriptedCounters {
    fn read_counter(&self, pid: ProcessId) -> Result<IoCounterSnapshot> {
        let ProcessId::Pid(raw) = pid else {
            return Err(Error::NotFound { pid });
        };
        let mut values = self.values.borrow_mut();
        let queue = values.get_mut(&raw).ok_or(Error::NotFound { pid })?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        };
        let write_bytes = next.ok_or(Error::NotFound { pid })?;
        Ok(IoCounterSnapshot { write_bytes })
    }

    fn running_pids(&self) -> Result<Vec<u32>> {
        Ok(self.values.borrow().keys().copied().collect())
    }
}

/// Counts how often each fake file was resolved and released.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub(crate) resolved: RefCell<HashMap<usize, usize>>,
    pub(crate) released: RefCell<HashMap<usize, usize>>,
}

impl Ledger {
    pub(crate) fn released(&self, id: usize) -> usize {
        self.released.borrow().get(&id).copied().unwrap_or(0)
    }
}

#[derive(Debug)]
pub(crate) struct CountingFile {
    id: usize,
    path: Option<PathBuf>,
    ledger: Rc<Ledger>,
}

impl EventFile for CountingFile {
    fn resolve_path(&self) -> io::Result<PathBuf> {
        *self.ledger.resolved.borrow_mut().entry(self.id).or_default() += 1;
        self.path
            .clone()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

impl Drop for CountingFile {
    fn drop(&mut self) {
        *self.ledger.released.borrow_mut().entry(self.id).or_default() += 1;
    }
}

/// Builds a close-write event whose file resolves to `path` (or fails if `None`).
pub(crate) fn event(
    ledger: &Rc<Ledger>,
    id: usize,
    pid: i32,
    path: Option<&str>,
) -> ChangeEvent<CountingFile> {
    let metadata = EventMetadata {
        event_len: METADATA_LEN as u32,
        version: METADATA_VERSION,
        metadata_len: METADATA_LEN as u16,
        mask: EventMask::CLOSE_WRITE,
        fd: 100 + id as i32,
        pid,
    };
    ChangeEvent::new(
        metadata,
        Some(CountingFile {
            id,
            path: path.map(PathBuf::from),
            ledger: Rc::clone(ledger),
        }),
    )
}

/// Replays queued results, then blocks forever like an idle kernel queue.
#[derive(Debug, Default)]
pub(crate) struct QueueSource {
    queue: VecDeque<fanotify::Result<ChangeEvent<CountingFile>>>,
}

impl QueueSource {
    pub(crate) fn new(
        events: impl IntoIterator<Item = fanotify::Result<ChangeEvent<CountingFile>>>,
    ) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl EventSource for QueueSource {
    type File = CountingFile;

    async fn next_event(&mut self) -> fanotify::Result<ChangeEvent<CountingFile>> {
        match self.queue.pop_front() {
            Some(next) => next,
            None => std::future::pending().await,
        }
    }
}
