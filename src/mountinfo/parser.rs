//! Mountinfo line parser for Linux systems.
//!
//! Parses lines in `/proc/[pid]/mountinfo` format. See
//! [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html)
//! for details on the structure.
//!
//! Lines are handled as raw bytes. The kernel only escapes whitespace and
//! backslashes, so paths may contain bytes that are not valid UTF-8.

use std::borrow::Cow;

/// Represents a parsed mountinfo line.
#[derive(Debug, PartialEq, Eq)]
pub struct MountInfo<'a> {
    /// Mount ID field.
    pub mount_id: &'a [u8],
    /// Parent mount ID field.
    pub parent_id: &'a [u8],
    /// Major:Minor device identifier.
    pub major_minor: &'a [u8],
    /// Root of the mount within the filesystem.
    pub root: &'a [u8],
    /// Mount point relative to the process's root, still octal-escaped.
    pub mount_point: &'a [u8],
    /// Per-mount options (e.g., `rw,relatime`).
    pub mount_options: &'a [u8],
    /// Optional tagged fields such as `shared:20` (can be empty).
    pub optional_fields: Vec<&'a [u8]>,
    /// Filesystem type (e.g., `ext4`, `tmpfs`).
    pub fs_type: &'a [u8],
    /// Source of the mount (e.g., `/dev/sda1`), still octal-escaped.
    pub source: &'a [u8],
    /// Superblock options.
    pub super_options: &'a [u8],
}

/// Named fields in a mountinfo line.
#[derive(Debug)]
pub enum MountInfoField {
    MountId,
    ParentId,
    MajorMinor,
    Root,
    MountPoint,
    MountOptions,
    FsType,
    Source,
    SuperOptions,
}

impl std::fmt::Display for MountInfoField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MountInfoField::MountId => "mount_id",
            MountInfoField::ParentId => "parent_id",
            MountInfoField::MajorMinor => "major:minor",
            MountInfoField::Root => "root",
            MountInfoField::MountPoint => "mount_point",
            MountInfoField::MountOptions => "mount_options",
            MountInfoField::FsType => "fs_type",
            MountInfoField::Source => "source",
            MountInfoField::SuperOptions => "super_options",
        };
        write!(f, "{name}")
    }
}

/// Errors that may occur when parsing a mountinfo line.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum ParseError {
    #[error("missing separator ` - ` in line: `{0}`")]
    MissingSeparator(String),

    #[error("missing `{field}` in pre-separator section of line: `{line}`")]
    MissingPreSeparatorField { field: MountInfoField, line: String },

    #[error("missing `{field}` in post-separator section of line: `{line}`")]
    MissingPostSeparatorField { field: MountInfoField, line: String },
}

const SEPARATOR: &[u8] = b" - ";

/// Line text for error messages.
fn display_line(line: &[u8]) -> String {
    String::from_utf8_lossy(line.trim_ascii_end()).into_owned()
}

fn fields(section: &[u8]) -> impl Iterator<Item = &[u8]> {
    section
        .split(u8::is_ascii_whitespace)
        .filter(|field| !field.is_empty())
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a [u8]>,
    field: MountInfoField,
    line: &[u8],
    pre_separator: bool,
) -> Result<&'a [u8], ParseError> {
    fields.next().ok_or_else(|| {
        let line = display_line(line);
        if pre_separator {
            ParseError::MissingPreSeparatorField { field, line }
        } else {
            ParseError::MissingPostSeparatorField { field, line }
        }
    })
}

/// Parses a single line of mountinfo data.
///
/// The line must follow the Linux kernel format described in [`proc_pid_mountinfo(5)`](https://man7.org/linux/man-pages/man5/proc_pid_mountinfo.5.html).
/// Fields borrow from `line`; only the optional fields are collected.
///
/// # Errors
///
/// Returns [`ParseError`] variants for missing separator or required fields.
pub fn parse_mount_info_line(line: &[u8]) -> Result<MountInfo<'_>, ParseError> {
    let at = line
        .windows(SEPARATOR.len())
        .position(|window| window == SEPARATOR)
        .ok_or_else(|| ParseError::MissingSeparator(display_line(line)))?;
    let (pre, post) = (&line[..at], &line[at + SEPARATOR.len()..]);

    let mut pre_fields = fields(pre);
    let mount_id = next_field(&mut pre_fields, MountInfoField::MountId, line, true)?;
    let parent_id = next_field(&mut pre_fields, MountInfoField::ParentId, line, true)?;
    let major_minor = next_field(&mut pre_fields, MountInfoField::MajorMinor, line, true)?;
    let root = next_field(&mut pre_fields, MountInfoField::Root, line, true)?;
    let mount_point = next_field(&mut pre_fields, MountInfoField::MountPoint, line, true)?;
    let mount_options = next_field(&mut pre_fields, MountInfoField::MountOptions, line, true)?;
    let optional_fields: Vec<&[u8]> = pre_fields.collect();

    let mut post_fields = fields(post);
    let fs_type = next_field(&mut post_fields, MountInfoField::FsType, line, false)?;
    let source = next_field(&mut post_fields, MountInfoField::Source, line, false)?;
    let super_options = next_field(&mut post_fields, MountInfoField::SuperOptions, line, false)?;

    Ok(MountInfo {
        mount_id,
        parent_id,
        major_minor,
        root,
        mount_point,
        mount_options,
        optional_fields,
        fs_type,
        source,
        super_options,
    })
}

/// Decodes the `\ooo` octal escapes the kernel uses for whitespace and
/// backslashes in mountinfo paths.
///
/// Sequences that are not three octal digits are kept verbatim.
pub fn unescape_octal(field: &[u8]) -> Cow<'_, [u8]> {
    if !field.contains(&b'\\') {
        return Cow::Borrowed(field);
    }

    let mut out = Vec::with_capacity(field.len());
    let mut i = 0;
    while i < field.len() {
        if field[i] == b'\\' && i + 3 < field.len() {
            let digits = &field[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(field[i]);
        i += 1;
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_mountinfo_line() {
        let line = b"42 35 8:1 / /mnt rw,nosuid - ext4 /dev/sda1 rw,data=ordered";
        let result = parse_mount_info_line(line).unwrap();

        assert_eq!(result.mount_id, b"42");
        assert_eq!(result.parent_id, b"35");
        assert_eq!(result.major_minor, b"8:1");
        assert_eq!(result.root, b"/");
        assert_eq!(result.mount_point, b"/mnt");
        assert_eq!(result.mount_options, b"rw,nosuid");
        assert_eq!(result.fs_type, b"ext4");
        assert_eq!(result.source, b"/dev/sda1");
        assert_eq!(result.super_options, b"rw,data=ordered");
        assert!(result.optional_fields.is_empty());
    }

    #[test]
    fn test_error_on_missing_separator() {
        let line = b"42 35 0:22 / /mnt rw,nosuid ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }

    #[test]
    fn test_parses_valid_line_with_multiple_optional_fields() {
        let line = b"70 56 8:17 / /var rw,nosuid,nodev,noexec,relatime shared:20 master:1 - ext4 /dev/sdb1 rw,errors=remount-ro";
        let result = parse_mount_info_line(line).unwrap();
        assert_eq!(result.mount_options, b"rw,nosuid,nodev,noexec,relatime");
        assert_eq!(result.optional_fields, vec![&b"shared:20"[..], &b"master:1"[..]]);
        assert_eq!(result.source, b"/dev/sdb1");
    }

    #[test]
    fn test_error_on_missing_mount_point() {
        let line = b"42 35 0:22 / - ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingPreSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "mount_point");
            }
            _ => panic!("Expected MissingPreSeparatorField"),
        }
    }

    #[test]
    fn test_error_on_missing_mount_options() {
        let line = b"42 35 0:22 / /mnt - ext4 /dev/sda1 rw";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingPreSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "mount_options");
            }
            _ => panic!("Expected MissingPreSeparatorField"),
        }
    }

    #[test]
    fn test_error_on_missing_post_separator_fields() {
        let line = b"42 35 0:22 / /mnt rw - ext4 /dev/sda1";
        let err = parse_mount_info_line(line).unwrap_err();
        match err {
            ParseError::MissingPostSeparatorField { field, .. } => {
                assert_eq!(field.to_string(), "super_options");
            }
            _ => panic!("Expected MissingPostSeparatorField"),
        }
    }

    #[test]
    fn test_error_on_empty_line() {
        let err = parse_mount_info_line(b"").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator(_)));
    }

    #[test]
    fn test_parses_line_with_non_utf8_mount_point() {
        let line = b"29 28 8:2 / /mnt/caf\xe9 rw - ext4 /dev/sdb1 rw";
        let result = parse_mount_info_line(line).unwrap();
        assert_eq!(result.mount_point, b"/mnt/caf\xe9");
        assert_eq!(result.source, b"/dev/sdb1");
    }

    #[test]
    fn test_unescapes_space_and_backslash() {
        assert_eq!(unescape_octal(b"/mnt/my\\040disk").as_ref(), b"/mnt/my disk");
        assert_eq!(unescape_octal(b"/a\\134b").as_ref(), b"/a\\b");
        assert_eq!(unescape_octal(b"/tab\\011x").as_ref(), b"/tab\tx");
    }

    #[test]
    fn test_unescape_keeps_decoded_bytes_raw() {
        assert_eq!(unescape_octal(b"/caf\\351").as_ref(), b"/caf\xe9");
    }

    #[test]
    fn test_unescape_keeps_plain_and_malformed_sequences() {
        assert!(matches!(unescape_octal(b"/plain"), Cow::Borrowed(b"/plain")));
        assert_eq!(unescape_octal(b"/bad\\09").as_ref(), b"/bad\\09");
        assert_eq!(unescape_octal(b"/end\\").as_ref(), b"/end\\");
    }
}
