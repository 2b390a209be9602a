use std::collections::VecDeque;
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tokio::io::unix::AsyncFd;

use super::event::{ChangeEvent, EventFd, EventSource};
use super::record::{EventMask, RecordReader};
use super::{Error, Result};

/// Events every mark subscribes to.
pub const WRITE_EVENTS: EventMask = EventMask::CLOSE_WRITE.union(EventMask::MODIFY);

const READ_BUFFER_LEN: usize = 16 * 1024;

/// A fanotify group that is still being configured.
#[derive(Debug)]
pub struct NotificationGroup {
    fd: OwnedFd,
    marks: usize,
}

impl NotificationGroup {
    /// Opens a pre-content class group with an unbounded event queue.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] without `CAP_SYS_ADMIN`.
    /// - [`Error::Init`] if the kernel lacks fanotify or rejects the flags.
    pub fn init() -> Result<Self> {
        let flags = libc::FAN_CLASS_PRE_CONTENT
            | libc::FAN_UNLIMITED_QUEUE
            | libc::FAN_CLOEXEC
            | libc::FAN_NONBLOCK;
        let event_f_flags = (libc::O_RDONLY | libc::O_LARGEFILE) as libc::c_uint;

        // SAFETY: plain syscall with constant arguments.
        let raw = unsafe { libc::fanotify_init(flags, event_f_flags) };
        if raw < 0 {
            let source = io::Error::last_os_error();
            return Err(match source.raw_os_error() {
                Some(libc::EPERM) => Error::PermissionDenied,
                _ => Error::Init { source },
            });
        }

        // SAFETY: `raw` is a freshly created descriptor nobody else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self { fd, marks: 0 })
    }

    /// Subscribes to write events for the whole mount containing `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mark`] if the kernel rejects the mark.
    pub fn mark(&mut self, dir: &Path) -> Result<()> {
        let c_path = CString::new(dir.as_os_str().as_bytes()).map_err(|_| Error::Mark {
            path: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"),
        })?;

        // SAFETY: the group descriptor is open and `c_path` is NUL-terminated.
        let ret = unsafe {
            libc::fanotify_mark(
                self.fd.as_raw_fd(),
                libc::FAN_MARK_ADD | libc::FAN_MARK_MOUNT,
                WRITE_EVENTS.bits(),
                libc::AT_FDCWD,
                c_path.as_ptr(),
            )
        };
        if ret < 0 {
            return Err(Error::Mark {
                path: dir.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }

        self.marks += 1;
        log::debug!("Marked mount {} for {:?}", dir.display(), WRITE_EVENTS);
        Ok(())
    }

    /// Number of successful marks so far.
    pub fn marks(&self) -> usize {
        self.marks
    }

    /// Starts streaming events. No further marks can be added.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if the descriptor cannot be registered with the runtime.
    pub fn into_channel(self) -> Result<EventChannel> {
        let fd = AsyncFd::new(self.fd).map_err(|source| Error::Init { source })?;
        Ok(EventChannel {
            fd: Some(fd),
            pending: VecDeque::new(),
            buf: vec![0u8; READ_BUFFER_LEN],
        })
    }
}

/// A streaming fanotify group.
///
/// Decoded events whose files were not consumed yet are held in `pending`
/// and released when the channel is closed or dropped.
#[derive(Debug)]
pub struct EventChannel {
    fd: Option<AsyncFd<OwnedFd>>,
    pending: VecDeque<ChangeEvent>,
    buf: Vec<u8>,
}

impl EventChannel {
    /// Releases the group and any buffered event files. Idempotent.
    pub fn close(&mut self) {
        self.pending.clear();
        if self.fd.take().is_some() {
            log::debug!("Closed fanotify channel");
        }
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl EventSource for EventChannel {
    type File = EventFd;

    async fn next_event(&mut self) -> Result<ChangeEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }

            let fd = self.fd.as_ref().ok_or(Error::Closed)?;
            let mut guard = fd
                .readable()
                .await
                .map_err(|source| Error::Read { source })?;

            match guard.try_io(|inner| read_raw(inner.get_ref(), &mut self.buf)) {
                // A group descriptor never reaches end of file while it is open.
                Ok(Ok(0)) => {
                    return Err(Error::Read {
                        source: io::Error::from(io::ErrorKind::UnexpectedEof),
                    });
                }
                Ok(Ok(len)) => decode_batch(&self.buf[..len], &mut self.pending)?,
                Ok(Err(err)) if err.kind() == io::ErrorKind::Interrupted => {}
                Ok(Err(source)) => return Err(Error::Read { source }),
                Err(_would_block) => {}
            }
        }
    }
}

fn read_raw(fd: &OwnedFd, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
    let n = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

/// Wraps each decoded record's descriptor as soon as it is trusted.
fn decode_batch(buf: &[u8], pending: &mut VecDeque<ChangeEvent>) -> Result<()> {
    for record in RecordReader::new(buf) {
        let metadata = record?;
        // FAN_NOFD (-1) marks events without a file, e.g. queue overflow.
        let file = if metadata.fd < 0 {
            None
        } else {
            // SAFETY: the kernel installed this descriptor for us with the
            // event; it is owned by nothing else.
            Some(EventFd::new(unsafe { OwnedFd::from_raw_fd(metadata.fd) }))
        };
        pending.push_back(ChangeEvent::new(metadata, file));
    }
    Ok(())
}
