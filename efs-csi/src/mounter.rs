//! Host mount operations used by the node service.

use std::fs;
use std::io;
use std::path::Path;

/// The host operations the node service depends on.
///
/// Every method blocks and must be idempotent where the operating system
/// allows it: creating an existing directory succeeds, and the reference
/// count is read fresh from the mount table on each call.
pub trait Mounter: Send + Sync + 'static {
    /// Create `path` and any missing parents.
    fn ensure_dir(&self, path: &Path) -> io::Result<()>;

    fn mount(
        &self,
        source: &str,
        target: &Path,
        fs_type: &str,
        options: &[String],
    ) -> io::Result<()>;

    fn unmount(&self, target: &Path) -> io::Result<()>;

    /// The device mounted at `path` and the number of mount table entries
    /// sharing it. Zero means nothing is mounted at `path`.
    fn device_ref_count(&self, path: &Path) -> io::Result<(String, usize)>;
}

/// [`Mounter`] backed by the host's `mount`/`umount` binaries and
/// `/proc/mounts`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounter;

impl Mounter for SystemMounter {
    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn mount(
        &self,
        source: &str,
        target: &Path,
        fs_type: &str,
        options: &[String],
    ) -> io::Result<()> {
        mounter::mount(source, target, fs_type, options).map_err(io::Error::from)
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        mounter::unmount(target).map_err(io::Error::from)
    }

    fn device_ref_count(&self, path: &Path) -> io::Result<(String, usize)> {
        mounter::device_ref_count(path).map_err(io::Error::from)
    }
}
