use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ResultOkLogExt;
use crate::fanotify::{ChangeEvent, EventFile};
use crate::procfs::{CounterReader, IoCounterSnapshot, ProcessId};

use super::AccumulatedBytes;

/// Last observed write counter of each process.
#[derive(Debug, Default, Clone)]
pub struct ProcessCounterTable {
    snapshots: HashMap<u32, IoCounterSnapshot>,
}

impl ProcessCounterTable {
    /// Samples every running process once.
    ///
    /// Processes that exit or cannot be read while seeding are left out.
    pub fn seed(counters: &impl CounterReader) -> Self {
        let mut table = Self::default();
        let Some(pids) = counters.running_pids().ok_log() else {
            return table;
        };

        for pid in pids {
            match counters.read_counter(ProcessId::Pid(pid)) {
                Ok(snapshot) => {
                    table.snapshots.insert(pid, snapshot);
                }
                Err(err) => log::debug!("Skipping pid {pid} while seeding: {err}"),
            }
        }
        log::debug!("Seeded write counters for {} processes", table.len());
        table
    }

    pub fn get(&self, pid: u32) -> Option<&IoCounterSnapshot> {
        self.snapshots.get(&pid)
    }

    /// Stores `snapshot` for `pid`, returning the previous one.
    pub fn update(&mut self, pid: u32, snapshot: IoCounterSnapshot) -> Option<IoCounterSnapshot> {
        self.snapshots.insert(pid, snapshot)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// What happened to a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// `delta` bytes were added to `path`.
    Attributed { path: PathBuf, delta: u64 },
    /// The originating process exited before its counter could be read.
    ProcessGone,
    /// The counter could not be read for another reason.
    CounterUnavailable,
    /// The event's file could not be resolved to a path.
    Unresolved,
    /// The event carried no file.
    NoFile,
}

/// Correlates change events with per-process write counters.
#[derive(Debug)]
pub struct AttributionEngine<C> {
    counters: C,
    table: ProcessCounterTable,
    accumulated: AccumulatedBytes,
}

impl<C: CounterReader> AttributionEngine<C> {
    /// Creates an engine with an explicit starting table.
    pub fn new(counters: C, table: ProcessCounterTable) -> Self {
        Self {
            counters,
            table,
            accumulated: AccumulatedBytes::new(),
        }
    }

    /// Creates an engine seeded with every currently running process.
    pub fn seeded(counters: C) -> Self {
        let table = ProcessCounterTable::seed(&counters);
        Self::new(counters, table)
    }

    /// Attributes one event, consuming it.
    ///
    /// The event's file is released on every path through this function.
    pub fn attribute<F: EventFile>(&mut self, event: ChangeEvent<F>) -> Attribution {
        let metadata = event.metadata;
        if !event.has_file() {
            log::warn!(
                "Event {:?} from pid {} carries no file, skipping",
                metadata.mask,
                metadata.pid
            );
            return Attribution::NoFile;
        }

        let Ok(pid) = u32::try_from(metadata.pid) else {
            log::warn!("Event with invalid pid {}, skipping", metadata.pid);
            return Attribution::CounterUnavailable;
        };

        let current = match self.counters.read_counter(ProcessId::Pid(pid)) {
            Ok(snapshot) => snapshot,
            Err(err) if err.is_not_found() => {
                log::trace!("pid {pid} exited before its counter was read");
                return Attribution::ProcessGone;
            }
            Err(err) => {
                log::warn!("{err}");
                return Attribution::CounterUnavailable;
            }
        };

        let delta = match self.table.update(pid, current) {
            Some(previous) => current.delta_since(&previous),
            None => 0,
        };

        let path = match event.resolve_and_release() {
            Some(Ok(path)) => path,
            Some(Err(err)) => {
                log::warn!("Failed to resolve file of event from pid {pid}: {err}");
                return Attribution::Unresolved;
            }
            None => return Attribution::NoFile,
        };

        log::trace!(
            "pid {pid} {:?} {} +{delta} bytes",
            metadata.mask,
            path.display()
        );
        self.accumulated.add(path.clone(), delta);
        Attribution::Attributed { path, delta }
    }

    pub fn accumulated(&self) -> &AccumulatedBytes {
        &self.accumulated
    }

    pub fn table(&self) -> &ProcessCounterTable {
        &self.table
    }
}
