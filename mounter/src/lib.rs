//! Host mount helpers for CSI node plugins.
//!
//! This crate wraps the pieces of the host mount subsystem a node plugin
//! needs and nothing more:
//!
//! - `mount` / `unmount` run the system `mount(8)` and `umount(8)` binaries so
//!   that filesystem-specific helpers (for example `mount.efs`) are honoured.
//! - [`MountTable`] reads `/proc/mounts` and answers reference-count queries.
//!
//! All functions block. Async callers should run them on a blocking thread.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//!
//! let target = Path::new("/var/lib/kubelet/pods/x/volumes/efs");
//! mounter::mount("fs-abc123:/", target, "efs", &["tls".to_string()])?;
//!
//! let (device, refs) = mounter::device_ref_count(target)?;
//! assert_eq!(device, "fs-abc123:/");
//! assert!(refs >= 1);
//! ```

mod command;
mod error;
mod table;

pub use command::{mount, unmount};
pub use error::{Error, Result};
pub use table::{MountEntry, MountTable, PROC_MOUNTS, device_ref_count};
