use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::path::PathBuf;

use crate::fsutil;

use super::Result;
use super::record::EventMetadata;

/// The changed file attached to an event.
///
/// Dropping the handle releases it; ownership guarantees it happens exactly once.
pub trait EventFile {
    /// Resolves the file to its canonical path while the handle is still open.
    fn resolve_path(&self) -> io::Result<PathBuf>;
}

/// Descriptor the kernel opened in this process for an event.
#[derive(Debug)]
pub struct EventFd(OwnedFd);

impl EventFd {
    pub fn new(fd: OwnedFd) -> Self {
        Self(fd)
    }
}

impl EventFile for EventFd {
    fn resolve_path(&self) -> io::Result<PathBuf> {
        fsutil::resolve_fd_path(self.0.as_fd())
    }
}

/// A single filesystem change notification.
#[derive(Debug)]
pub struct ChangeEvent<F = EventFd> {
    pub metadata: EventMetadata,
    file: Option<F>,
}

impl<F: EventFile> ChangeEvent<F> {
    pub fn new(metadata: EventMetadata, file: Option<F>) -> Self {
        Self { metadata, file }
    }

    /// Returns `true` if the kernel attached an open file to the event.
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    /// Resolves the attached file's path, then releases the file.
    ///
    /// Returns `None` if the event carried no file. The file is released
    /// whether or not resolution succeeds.
    pub fn resolve_and_release(mut self) -> Option<io::Result<PathBuf>> {
        let file = self.file.take()?;
        let path = file.resolve_path();
        drop(file);
        Some(path)
    }
}

/// A non-restartable stream of change events.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    type File: EventFile;

    /// Waits for the next event.
    ///
    /// Dropping the returned future before it completes must not lose events.
    ///
    /// # Errors
    ///
    /// Any error is fatal; the source must not be polled again afterwards.
    async fn next_event(&mut self) -> Result<ChangeEvent<Self::File>>;
}
