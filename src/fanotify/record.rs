//! Decoding of the fixed-layout `fanotify_event_metadata` records returned by
//! `read(2)` on a fanotify group.
//!
//! Layout (native endian), see `fanotify(7)`:
//!
//! | offset | width | field          |
//! |--------|-------|----------------|
//! | 0      | 4     | `event_len`    |
//! | 4      | 1     | `vers`         |
//! | 5      | 1     | `reserved`     |
//! | 6      | 2     | `metadata_len` |
//! | 8      | 8     | `mask`         |
//! | 16     | 4     | `fd`           |
//! | 20     | 4     | `pid`          |

use std::os::fd::RawFd;

use super::{Error, Result};

/// Metadata version this decoder understands (`FANOTIFY_METADATA_VERSION`).
pub const METADATA_VERSION: u8 = 3;

/// Size of the fixed metadata header (`FAN_EVENT_METADATA_LEN`).
pub const METADATA_LEN: usize = 24;

/// Descriptor value of events that carry no open file (`FAN_NOFD`).
pub const NO_FD: RawFd = -1;

bitflags::bitflags! {
    /// Bit set of fanotify event types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventMask: u64 {
        const MODIFY = libc::FAN_MODIFY;
        const CLOSE_WRITE = libc::FAN_CLOSE_WRITE;
        const Q_OVERFLOW = libc::FAN_Q_OVERFLOW;
    }
}

/// One decoded event header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMetadata {
    /// Length of this record including any trailing information records.
    pub event_len: u32,
    pub version: u8,
    /// Length of the fixed header as reported by the kernel.
    pub metadata_len: u16,
    pub mask: EventMask,
    /// Descriptor installed in this process for the changed file, or [`NO_FD`].
    pub fd: RawFd,
    /// Process that caused the event.
    pub pid: i32,
}

impl EventMetadata {
    /// Encodes the header in the kernel layout.
    pub fn to_bytes(&self) -> [u8; METADATA_LEN] {
        let mut out = [0u8; METADATA_LEN];
        out[0..4].copy_from_slice(&self.event_len.to_ne_bytes());
        out[4] = self.version;
        out[6..8].copy_from_slice(&self.metadata_len.to_ne_bytes());
        out[8..16].copy_from_slice(&self.mask.bits().to_ne_bytes());
        out[16..20].copy_from_slice(&self.fd.to_ne_bytes());
        out[20..24].copy_from_slice(&self.pid.to_ne_bytes());
        out
    }
}

/// Iterator over the records contained in one `read(2)` buffer.
///
/// The version byte is checked before any other field is interpreted. After
/// the first error the iterator is exhausted; records past a bad one are never
/// decoded.
#[derive(Debug)]
pub struct RecordReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn decode_next(&mut self) -> Result<EventMetadata> {
        let offset = self.offset;
        let rest = &self.buf[offset..];

        if rest.len() < METADATA_LEN {
            return Err(Error::MalformedRecord {
                offset,
                reason: "truncated metadata header",
            });
        }

        let version = rest[4];
        if version != METADATA_VERSION {
            return Err(Error::ProtocolVersionMismatch {
                expected: METADATA_VERSION,
                found: version,
            });
        }

        let event_len = u32::from_ne_bytes(field(rest, 0));
        let metadata_len = u16::from_ne_bytes(field(rest, 6));
        if usize::from(metadata_len) < METADATA_LEN {
            return Err(Error::MalformedRecord {
                offset,
                reason: "metadata_len shorter than header",
            });
        }
        let event_len_usize = event_len as usize;
        if event_len_usize < usize::from(metadata_len) {
            return Err(Error::MalformedRecord {
                offset,
                reason: "event_len shorter than metadata_len",
            });
        }
        if event_len_usize > rest.len() {
            return Err(Error::MalformedRecord {
                offset,
                reason: "event_len exceeds buffer",
            });
        }

        self.offset += event_len_usize;
        Ok(EventMetadata {
            event_len,
            version,
            metadata_len,
            mask: EventMask::from_bits_retain(u64::from_ne_bytes(field(rest, 8))),
            fd: i32::from_ne_bytes(field(rest, 16)),
            pid: i32::from_ne_bytes(field(rest, 20)),
        })
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<EventMetadata>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.buf.len() {
            return None;
        }
        let record = self.decode_next();
        if record.is_err() {
            self.offset = self.buf.len();
        }
        Some(record)
    }
}

/// Copies `N` bytes starting at `at`; callers have checked the header length.
fn field<const N: usize>(rest: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&rest[at..at + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fd: RawFd, pid: i32, mask: EventMask) -> EventMetadata {
        EventMetadata {
            event_len: METADATA_LEN as u32,
            version: METADATA_VERSION,
            metadata_len: METADATA_LEN as u16,
            mask,
            fd,
            pid,
        }
    }

    #[test]
    fn test_decodes_multiple_records_in_order() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&record(7, 100, EventMask::CLOSE_WRITE).to_bytes());
        buf.extend_from_slice(&record(8, 200, EventMask::MODIFY).to_bytes());

        let records: Vec<_> = RecordReader::new(&buf).collect::<Result<_>>().unwrap();
        assert_eq!(
            records,
            vec![
                record(7, 100, EventMask::CLOSE_WRITE),
                record(8, 200, EventMask::MODIFY)
            ]
        );
    }

    #[test]
    fn test_skips_trailing_info_records_using_event_len() {
        let mut first = record(7, 100, EventMask::MODIFY);
        first.event_len = (METADATA_LEN + 8) as u32;

        let mut buf = Vec::new();
        buf.extend_from_slice(&first.to_bytes());
        buf.extend_from_slice(&[0xAA; 8]);
        buf.extend_from_slice(&record(9, 300, EventMask::MODIFY).to_bytes());

        let records: Vec<_> = RecordReader::new(&buf).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fd, 9);
    }

    #[test]
    fn test_version_mismatch_is_reported_and_stops_decoding() {
        let mut bad = record(7, 100, EventMask::MODIFY);
        bad.version = 2;

        let mut buf = Vec::new();
        buf.extend_from_slice(&bad.to_bytes());
        buf.extend_from_slice(&record(8, 200, EventMask::MODIFY).to_bytes());

        let mut reader = RecordReader::new(&buf);
        match reader.next() {
            Some(Err(Error::ProtocolVersionMismatch { expected, found })) => {
                assert_eq!(expected, METADATA_VERSION);
                assert_eq!(found, 2);
            }
            other => panic!("expected version mismatch, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_header_is_malformed() {
        let bytes = record(7, 100, EventMask::MODIFY).to_bytes();
        let err = RecordReader::new(&bytes[..10]).next().unwrap().unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { offset: 0, .. }));
    }

    #[test]
    fn test_event_len_past_buffer_is_malformed() {
        let mut rec = record(7, 100, EventMask::MODIFY);
        rec.event_len = 64;
        let err = RecordReader::new(&rec.to_bytes())
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRecord {
                reason: "event_len exceeds buffer",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_event_len_cannot_loop_forever() {
        let mut rec = record(7, 100, EventMask::MODIFY);
        rec.event_len = 0;
        let results: Vec<_> = RecordReader::new(&rec.to_bytes()).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_empty_buffer_yields_nothing() {
        assert!(RecordReader::new(&[]).next().is_none());
    }

    #[test]
    fn test_unknown_mask_bits_survive_decoding() {
        let mask = EventMask::CLOSE_WRITE | EventMask::from_bits_retain(0x20);
        let bytes = record(7, 100, mask).to_bytes();

        let decoded = RecordReader::new(&bytes).next().unwrap().unwrap();
        assert_eq!(decoded.mask.bits(), libc::FAN_CLOSE_WRITE | 0x20);
        assert!(decoded.mask.contains(EventMask::CLOSE_WRITE));
        assert!(!decoded.mask.contains(EventMask::MODIFY));
    }
}
