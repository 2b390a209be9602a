//! Kernel filesystem-change notifications via fanotify(7).
//!
//! A [`NotificationGroup`] is opened and marked on each mount of interest,
//! then turned into an [`EventChannel`] that yields [`ChangeEvent`]s. Each
//! event owns the descriptor the kernel opened for the changed file.
//!
//! ```text
//! NotificationGroup::init() -> mark(dir)* -> into_channel() -> next_event()* -> close()
//! ```
mod error;
mod event;
mod group;
mod record;

pub use error::{Error, Result};
pub use event::{ChangeEvent, EventFd, EventFile, EventSource};
pub use group::{EventChannel, NotificationGroup, WRITE_EVENTS};
pub use record::{EventMask, EventMetadata, METADATA_LEN, METADATA_VERSION, NO_FD, RecordReader};
