//! Writetop: attributes filesystem writes to files over a bounded window.
//!
//! Disk-backed mounts are discovered from the mount table and subscribed to
//! with fanotify. Each write event is credited with the growth of the writing
//! process's `write_bytes` counter since it was last seen, and the files with
//! the most attributed bytes are reported when the window closes.

use std::path::PathBuf;
use std::time::Duration;

use attribution::AttributionEngine;
use fanotify::NotificationGroup;
use procfs::ProcfsCounterReader;

pub mod attribution;
pub mod error;
pub mod fanotify;
pub mod fsutil;
pub mod mountinfo;
pub mod procfs;
pub mod window;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use window::{Report, ReportRow};

/// Settings for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How long events are collected.
    pub window: Duration,
    /// Maximum number of reported files.
    pub top: usize,
    /// Root of the procfs mount used for write counters.
    pub proc_path: PathBuf,
    /// Mount table enumerated for subscription targets.
    pub mountinfo_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5),
            top: 3,
            proc_path: PathBuf::from("/proc"),
            mountinfo_path: PathBuf::from("/proc/self/mountinfo"),
        }
    }
}

/// Runs one observation window and returns the ranking.
///
/// Must be called from within a tokio runtime. The window starts once every
/// mount is subscribed, so seeding the counter table counts against it. The
/// notification channel is closed before this returns, on success and on error.
///
/// # Errors
///
/// - [`Error::Config`] for a zero-length window.
/// - [`Error::Enumeration`] if the mount table cannot be read.
/// - [`Error::Notification`] if the fanotify group cannot be opened or marked,
///   or if the event stream breaks its protocol.
pub async fn run(config: &Config) -> Result<Report> {
    if config.window.is_zero() {
        return Err(Error::Config(
            "observation window must be longer than zero".into(),
        ));
    }

    let mounts = mountinfo::disk_backed_mounts(&config.mountinfo_path)?;
    if mounts.is_empty() {
        log::warn!(
            "No disk-backed mounts found in {}",
            config.mountinfo_path.display()
        );
    }

    let mut group = NotificationGroup::init()?;
    for mount in &mounts {
        group.mark(&mount.mount_point)?;
    }
    let deadline = tokio::time::Instant::now() + config.window;
    log::info!("Watching {} disk-backed mounts", group.marks());

    let mut engine = AttributionEngine::seeded(ProcfsCounterReader::new(&config.proc_path));
    let mut channel = group.into_channel()?;

    let observed = window::observe(&mut channel, &mut engine, deadline).await;
    channel.close();
    observed?;

    Ok(Report::from_accumulated(engine.accumulated(), config.top))
}
