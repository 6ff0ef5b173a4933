//! Mount table inspection via `/proc/mounts`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Location of the kernel's mount table for the current namespace.
pub const PROC_MOUNTS: &str = "/proc/mounts";

/// A single line of `/proc/mounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// The mounted device or remote source, e.g. `fs-abc123:/` or `/dev/sda1`.
    pub device: String,
    pub path: PathBuf,
}

/// A snapshot of the host mount table.
///
/// The table is never cached across calls; read a fresh one for every
/// decision that depends on it.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    /// Read the mount table of the current mount namespace.
    pub fn read() -> Result<Self> {
        Self::read_from(PROC_MOUNTS)
    }

    /// Read a mount table in `/proc/mounts` format from `path`.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadTable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    /// Parse mount table contents. Lines with fewer than four fields are
    /// skipped.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let entry = parse_line(line);
                if entry.is_none() {
                    debug!(line, "skipping malformed mount table line");
                }
                entry
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// The device mounted at `path` and how many entries reference that
    /// device, including `path` itself.
    ///
    /// `path` is normalized lexically before the lookup; the filesystem is
    /// never touched. Returns `("", 0)` when nothing is mounted at `path`.
    /// When several mounts are stacked on `path` the first one listed wins.
    pub fn device_ref_count(&self, path: &Path) -> (String, usize) {
        let path = normalize(path);
        let Some(device) = self
            .entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.device.as_str())
        else {
            return (String::new(), 0);
        };

        let refs = self.entries.iter().filter(|e| e.device == device).count();
        (device.to_string(), refs)
    }
}

/// Read the host mount table and report the reference count for `path`.
///
/// Only `/proc/mounts` is read. Stat-ing `path` itself could hang forever
/// on a hard mount whose server has gone away.
pub fn device_ref_count(path: &Path) -> Result<(String, usize)> {
    let table = MountTable::read()?;
    Ok(table.device_ref_count(path))
}

/// Collapse `.`, `..`, repeated and trailing separators without any syscall.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(component),
            },
            Component::CurDir => {}
            _ => out.push(component),
        }
    }
    out
}

fn parse_line(line: &str) -> Option<MountEntry> {
    let mut fields = line.split_whitespace();
    let device = fields.next()?;
    let path = fields.next()?;
    // fs type and options must be present for the line to be well formed.
    fields.next()?;
    fields.next()?;

    Some(MountEntry {
        device: unescape(device),
        path: PathBuf::from(unescape(path)),
    })
}

/// Decode the `\ooo` octal escapes the kernel uses for whitespace and
/// backslashes in mount table fields.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && let Some(byte) = octal_byte(&bytes[i + 1..i + 4])
        {
            out.push(byte);
            i += 4;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    digits.iter().try_fold(0u8, |acc, &d| {
        if !(b'0'..=b'7').contains(&d) {
            return None;
        }
        acc.checked_mul(8)?.checked_add(d - b'0')
    })
}
