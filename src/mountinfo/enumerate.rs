use crate::fsutil;

use super::parser::{parse_mount_info_line, unescape_octal};
use super::{Error, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::BufRead;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

/// Prefix of sources backed by a block device node.
const DEVICE_PREFIX: &str = "/dev/";

/// A mounted filesystem as listed in the live mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Source device or pseudo source (e.g., `/dev/nvme0n1p2`, `tmpfs`).
    pub source: String,
    /// Directory the filesystem is mounted on.
    pub mount_point: PathBuf,
    /// Filesystem type (e.g., `ext4`).
    pub fs_type: String,
    /// Per-mount options (e.g., `rw,relatime`).
    pub options: String,
}

impl MountPoint {
    /// Returns `true` if the mount's source is a physical disk device.
    pub fn is_disk_backed(&self) -> bool {
        self.source.starts_with(DEVICE_PREFIX)
    }
}

/// Lists all mounted filesystems from a Linux `mountinfo` file, in table order.
///
/// # Arguments
///
/// * `path` - Path to a mountinfo file (e.g., `/proc/self/mountinfo`).
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
///
/// # Example
///
/// ```no_run
/// use writetop::mountinfo::enumerate_mounts;
///
/// for mount in enumerate_mounts("/proc/self/mountinfo").unwrap() {
///     println!("{} on {}", mount.source, mount.mount_point.display());
/// }
/// ```
pub fn enumerate_mounts(path: impl AsRef<Path>) -> Result<Vec<MountPoint>> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    enumerate_mounts_from_reader(buf, path)
}

/// Lists the disk-backed mounts from a `mountinfo` file.
///
/// Each mount directory appears at most once, keeping the first entry.
///
/// # Errors
///
/// Same as [`enumerate_mounts`].
pub fn disk_backed_mounts(path: impl AsRef<Path>) -> Result<Vec<MountPoint>> {
    Ok(filter_disk_backed(enumerate_mounts(path)?))
}

/// Keeps the disk-backed entries of `mounts`, dropping repeated mount directories.
pub fn filter_disk_backed(mounts: Vec<MountPoint>) -> Vec<MountPoint> {
    let mut seen = HashSet::new();
    mounts
        .into_iter()
        .filter(MountPoint::is_disk_backed)
        .filter(|mount| seen.insert(mount.mount_point.clone()))
        .collect()
}

/// Internal implementation for reading mounts from a reader.
///
/// # Arguments
///
/// * `reader` - Buffered reader over the mountinfo content.
/// * `origin` - Logical origin of the data, used in error messages.
fn enumerate_mounts_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<Vec<MountPoint>> {
    let mut line = Vec::with_capacity(256);
    let mut mounts = Vec::new();

    while reader
        .read_until(b'\n', &mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        if line.trim_ascii().is_empty() {
            line.clear();
            continue;
        }

        let mount_info = parse_mount_info_line(&line).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        let mount = MountPoint {
            source: String::from_utf8_lossy(&unescape_octal(mount_info.source)).into_owned(),
            mount_point: PathBuf::from(OsString::from_vec(
                unescape_octal(mount_info.mount_point).into_owned(),
            )),
            fs_type: String::from_utf8_lossy(mount_info.fs_type).into_owned(),
            options: String::from_utf8_lossy(mount_info.mount_options).into_owned(),
        };
        log::debug!(
            "Found `{}` mount of `{}` on {}",
            mount.fs_type,
            mount.source,
            mount.mount_point.display()
        );
        mounts.push(mount);

        line.clear();
    }

    Ok(mounts)
}
