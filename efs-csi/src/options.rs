//! Mount option resolution.
//!
//! Turns a decoded [`VolumeHandle`] plus the request's volume context, mount
//! flags and read-only bit into the exact arguments handed to `mount`.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{VolumeHandle, clean_path, is_access_point_id};

/// Filesystem type passed to `mount -t`; dispatches to the `mount.efs` helper.
pub const FS_TYPE: &str = "efs";

/// The only volume context key this driver understands. Deprecated in favour
/// of putting the path in the volume handle.
pub const CONTEXT_PATH: &str = "path";

const ACCESS_POINT_OPTION: &str = "accesspoint=";
const TLS_OPTION: &str = "tls";
const READ_ONLY_OPTION: &str = "ro";

/// A fully resolved mount instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// `<fileSystemId>:<exportPath>`.
    pub source: String,
    pub target: String,
    pub fs_type: &'static str,
    /// Access point first, then `tls`, then `ro`, then the remaining flags in
    /// request order. No duplicates.
    pub options: Vec<String>,
}

/// Resolve the mount for `handle` at `target`.
///
/// Fails without side effects when the volume context carries an unknown
/// key or a relative path, or when an access point in the mount flags is
/// malformed or disagrees with the one in the handle.
pub fn resolve(
    handle: &VolumeHandle,
    volume_context: &HashMap<String, String>,
    mount_flags: &[String],
    read_only: bool,
    target: &str,
) -> Result<MountRequest> {
    let context_path = context_path(volume_context)?;

    let export_path = match context_path {
        Some(path) if !handle.has_explicit_path() => {
            warn!(
                volume_handle = %handle,
                path,
                "volume context property \"path\" is deprecated, put the path in the volume handle instead"
            );
            if !Path::new(path).is_absolute() {
                return Err(Error::RelativeContextPath);
            }
            clean_path(path)
        }
        _ => handle.export_path().to_string(),
    };

    let access_point = effective_access_point(handle, &export_path, mount_flags)?;

    let mut options: Vec<String> = Vec::with_capacity(mount_flags.len() + 3);
    if let Some(access_point) = access_point {
        options.push(format!("{ACCESS_POINT_OPTION}{access_point}"));
        // Access point mounts are only allowed over TLS.
        options.push(TLS_OPTION.to_string());
    }
    if read_only {
        push_unique(&mut options, READ_ONLY_OPTION);
    }
    for flag in mount_flags {
        if access_point_option(flag).is_none() {
            push_unique(&mut options, flag);
        }
    }

    Ok(MountRequest {
        source: format!("{}:{export_path}", handle.file_system_id()),
        target: target.to_string(),
        fs_type: FS_TYPE,
        options,
    })
}

/// Validate the volume context and return its `path` entry, if any.
fn context_path(volume_context: &HashMap<String, String>) -> Result<Option<&str>> {
    // Sorted so that the reported key is deterministic.
    let mut keys: Vec<&String> = volume_context.keys().collect();
    keys.sort();

    let mut path = None;
    for key in keys {
        if !key.eq_ignore_ascii_case(CONTEXT_PATH) {
            return Err(Error::UnsupportedVolumeContext(key.clone()));
        }
        path = Some(volume_context[key].as_str());
    }
    Ok(path)
}

/// The access point to mount through: the handle's, else one named in the
/// mount flags.
fn effective_access_point<'a>(
    handle: &'a VolumeHandle,
    export_path: &str,
    mount_flags: &'a [String],
) -> Result<Option<&'a str>> {
    let mut access_point = handle.access_point_id();

    for from_flags in mount_flags.iter().filter_map(|f| access_point_option(f)) {
        if !is_access_point_id(from_flags) {
            return Err(Error::InvalidMountOptionAccessPoint {
                access_point_id: from_flags.to_string(),
            });
        }
        match (handle.access_point_id(), access_point) {
            (Some(from_handle), _) if from_handle != from_flags => {
                return Err(Error::ConflictingAccessPoints {
                    mount_options: from_flags.to_string(),
                    volume_handle: from_handle.to_string(),
                });
            }
            (None, Some(first)) if first != from_flags => {
                return Err(Error::ConflictingMountOptionAccessPoints {
                    first: first.to_string(),
                    second: from_flags.to_string(),
                });
            }
            _ => {}
        }

        warn!(
            access_point = from_flags,
            "accesspoint in mount options is deprecated, use volume handle '{}:{}:{}' instead",
            handle.file_system_id(),
            export_path,
            from_flags
        );
        access_point = Some(from_flags);
    }

    Ok(access_point)
}

/// The access point ID named by an `accesspoint=<id>` flag. The key is
/// matched case-insensitively, the value is returned verbatim.
fn access_point_option(flag: &str) -> Option<&str> {
    let key = flag.get(..ACCESS_POINT_OPTION.len())?;
    key.eq_ignore_ascii_case(ACCESS_POINT_OPTION)
        .then(|| &flag[ACCESS_POINT_OPTION.len()..])
}

fn push_unique(options: &mut Vec<String>, option: &str) {
    if !options.iter().any(|o| o == option) {
        options.push(option.to_string());
    }
}
