use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use super::io::{IoCounterSnapshot, IoCounters};
use super::parser::KeyValueStat;
use super::{Error, Result, StatParseError};

/// Identifies the process whose counters are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessId {
    /// The reading process itself (`/proc/self`).
    SelfProcess,
    Pid(u32),
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessId::SelfProcess => write!(f, "self"),
            ProcessId::Pid(pid) => write!(f, "{pid}"),
        }
    }
}

/// Source of per-process cumulative write counters.
pub trait CounterReader {
    /// Samples the current write counter of `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the process no longer exists.
    fn read_counter(&self, pid: ProcessId) -> Result<IoCounterSnapshot>;

    /// Lists the ids of all currently running processes.
    fn running_pids(&self) -> Result<Vec<u32>>;
}

/// [`CounterReader`] backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcfsCounterReader {
    root: PathBuf,
}

impl ProcfsCounterReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads and parses the full `io` file of `pid`.
    pub fn read_io(&self, pid: ProcessId) -> Result<IoCounters> {
        let path = self.root.join(pid.to_string()).join("io");
        let file = File::open(&path).map_err(|source| classify_io_error(pid, &path, source))?;

        IoCounters::from_reader(&mut BufReader::new(file)).map_err(|err| match err {
            StatParseError::Io(source) => classify_io_error(pid, &path, source),
            source => Error::Parse { path, source },
        })
    }
}

impl Default for ProcfsCounterReader {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl CounterReader for ProcfsCounterReader {
    fn read_counter(&self, pid: ProcessId) -> Result<IoCounterSnapshot> {
        self.read_io(pid).map(|io| io.snapshot())
    }

    fn running_pids(&self) -> Result<Vec<u32>> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| Error::ListProcesses {
            path: self.root.clone(),
            source,
        })?;

        let mut pids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }
}

/// A vanished process shows up as `ENOENT` on open or `ESRCH` on read. A
/// process whose counters this reader may not see contributes nothing either,
/// so `EACCES` and `EPERM` are folded into [`Error::NotFound`] too.
fn classify_io_error(pid: ProcessId, path: &Path, source: io::Error) -> Error {
    match source.raw_os_error() {
        Some(libc::ENOENT) | Some(libc::ESRCH) => Error::NotFound { pid },
        Some(libc::EACCES) | Some(libc::EPERM) => {
            log::trace!("No permission to read {}: {source}", path.display());
            Error::NotFound { pid }
        }
        _ if source.kind() == io::ErrorKind::NotFound => Error::NotFound { pid },
        _ => Error::Read {
            path: path.to_path_buf(),
            source,
        },
    }
}
