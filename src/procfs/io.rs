//! Parsing of the per-process I/O accounting file `/proc/<pid>/io`.
//!
//! See [`proc_pid_io(5)`](https://man7.org/linux/man-pages/man5/proc_pid_io.5.html).
//!
//! # Example
//!
//! ```rust
//! use writetop::procfs::{IoCounters, KeyValueStat};
//!
//! let data = "\
//! rchar: 323934931
//! wchar: 323929600
//! syscr: 632687
//! syscw: 632675
//! read_bytes: 0
//! write_bytes: 323932160
//! cancelled_write_bytes: 0
//! ";
//! let io = IoCounters::from_reader(&mut data.as_bytes()).unwrap();
//!
//! assert_eq!(io.write_bytes, 323932160);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::parser::{FieldHandler, KeyValueStat};

/// Cumulative I/O counters of a single process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoCounters {
    /// Bytes passed to `read(2)` and similar calls.
    pub rchar: u64,
    /// Bytes passed to `write(2)` and similar calls.
    pub wchar: u64,
    /// Read syscalls.
    pub syscr: u64,
    /// Write syscalls.
    pub syscw: u64,
    /// Bytes fetched from the storage layer.
    pub read_bytes: u64,
    /// Bytes the process caused to be sent to the storage layer.
    pub write_bytes: u64,
    /// Bytes whose writeback was cancelled by truncation.
    pub cancelled_write_bytes: u64,
}

impl IoCounters {
    fn set_rchar(&mut self, v: u64) {
        self.rchar = v;
    }

    fn set_wchar(&mut self, v: u64) {
        self.wchar = v;
    }

    fn set_syscr(&mut self, v: u64) {
        self.syscr = v;
    }

    fn set_syscw(&mut self, v: u64) {
        self.syscw = v;
    }

    fn set_read_bytes(&mut self, v: u64) {
        self.read_bytes = v;
    }

    fn set_write_bytes(&mut self, v: u64) {
        self.write_bytes = v;
    }

    fn set_cancelled_write_bytes(&mut self, v: u64) {
        self.cancelled_write_bytes = v;
    }

    /// Returns the point-in-time write counter used for attribution.
    pub fn snapshot(&self) -> IoCounterSnapshot {
        IoCounterSnapshot {
            write_bytes: self.write_bytes,
        }
    }
}

static HANDLERS: LazyLock<HashMap<&'static str, FieldHandler<IoCounters>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, FieldHandler<IoCounters>> = HashMap::with_capacity(7);

        m.insert("rchar", IoCounters::set_rchar);
        m.insert("wchar", IoCounters::set_wchar);
        m.insert("syscr", IoCounters::set_syscr);
        m.insert("syscw", IoCounters::set_syscw);
        m.insert("read_bytes", IoCounters::set_read_bytes);
        m.insert("write_bytes", IoCounters::set_write_bytes);
        m.insert("cancelled_write_bytes", IoCounters::set_cancelled_write_bytes);

        m
    });

impl KeyValueStat for IoCounters {
    const KEY_SUFFIX: Option<char> = Some(':');
    const ALLOW_DUPLICATE_KEYS: bool = false;

    #[inline]
    fn field_handlers() -> &'static HashMap<&'static str, FieldHandler<Self>> {
        &HANDLERS
    }
}

/// A process's cumulative bytes-written counter at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCounterSnapshot {
    pub write_bytes: u64,
}

impl IoCounterSnapshot {
    /// Bytes written between `previous` and `self`.
    ///
    /// A counter that went backwards yields zero.
    pub fn delta_since(&self, previous: &IoCounterSnapshot) -> u64 {
        self.write_bytes.saturating_sub(previous.write_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::super::StatParseError;
    use super::*;

    #[test]
    fn test_parse_complete_io_file() {
        let data = "\
rchar: 1000
wchar: 2000
syscr: 10
syscw: 20
read_bytes: 4096
write_bytes: 8192
cancelled_write_bytes: 512
";
        let io = IoCounters::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(
            io,
            IoCounters {
                rchar: 1000,
                wchar: 2000,
                syscr: 10,
                syscw: 20,
                read_bytes: 4096,
                write_bytes: 8192,
                cancelled_write_bytes: 512,
            }
        );
        assert_eq!(io.snapshot().write_bytes, 8192);
    }

    #[test]
    fn test_parse_empty_io_file() {
        let io = IoCounters::from_reader(&mut "".as_bytes()).unwrap();
        assert_eq!(io, IoCounters::default());
    }

    #[test]
    fn test_ignore_unknown_keys() {
        let data = "future_field: 7\nwrite_bytes: 42\n";
        let io = IoCounters::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(io.write_bytes, 42);
    }

    #[test]
    fn test_invalid_value() {
        let data = "rchar: 1\nwrite_bytes: lots\n";
        let err = IoCounters::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "write_bytes");
                assert_eq!(value, "lots");
                assert_eq!(line, 2);
            }
            other => panic!("Expected InvalidKeyValue error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let data = "write_bytes: 1\nwrite_bytes: 2\n";
        let err = IoCounters::from_reader(&mut data.as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::DuplicateField { line: 2, .. }));
    }

    #[test]
    fn test_delta_is_clamped_at_zero() {
        let before = IoCounterSnapshot { write_bytes: 4096 };
        let after = IoCounterSnapshot { write_bytes: 1024 };
        assert_eq!(after.delta_since(&before), 0);
        assert_eq!(before.delta_since(&after), 3072);
    }
}
