use std::path::PathBuf;

/// Errors raised by the fanotify notification channel.
///
/// Every variant is fatal: once the kernel interface misbehaves the event
/// stream cannot be trusted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("permission denied opening fanotify group (requires CAP_SYS_ADMIN)")]
    PermissionDenied,
    #[error("failed to initialize fanotify group: {source}")]
    Init {
        #[source]
        source: std::io::Error,
    },
    #[error("failed to mark mount `{path}`: {source}")]
    Mark {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fanotify metadata version mismatch: expected {expected}, found {found}")]
    ProtocolVersionMismatch { expected: u8, found: u8 },
    #[error("malformed fanotify record at offset {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: &'static str },
    #[error("failed to read fanotify events: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },
    #[error("fanotify channel is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
