//! Discovery of mounted filesystems from `/proc/self/mountinfo`.
mod enumerate;
mod error;
mod parser;

pub use enumerate::{MountPoint, disk_backed_mounts, enumerate_mounts, filter_disk_backed};
pub use error::{Error, Result};
