//! Type-safe wrappers for CSI driver domain types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Export path used when the volume handle does not name one.
pub const DEFAULT_EXPORT_PATH: &str = "/";

const FIELD_SEPARATOR: char = ':';
const FIELDS_MAX: usize = 3;
const FILE_SYSTEM_ID_PREFIX: &str = "fs-";
const ACCESS_POINT_ID_PREFIX: &str = "fsap-";

/// Why a volume handle could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("expected at most three fields separated by ':'")]
    TooManyFields,

    #[error("expected a file system ID of the form 'fs-...'")]
    InvalidFileSystemId,

    #[error("expected it to be of the form 'fsap-...'")]
    InvalidAccessPointId { id: String },
}

/// A decoded EFS volume handle.
///
/// The wire form is `<fileSystemId>[:<exportPath>[:<accessPointId>]]`, e.g.
/// `fs-abc123`, `fs-abc123:/a/b`, `fs-abc123::fsap-abcd1234`.
///
/// The export path is normalized on decode: duplicate separators, `.` and
/// `..` are collapsed and trailing slashes dropped. Relative paths stay
/// relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHandle {
    file_system_id: String,
    /// `None` when the handle leaves the path empty.
    export_path: Option<String>,
    access_point_id: Option<String>,
}

impl VolumeHandle {
    /// Decode a volume handle from its wire form.
    pub fn parse(raw: &str) -> Result<Self, HandleError> {
        let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
        if fields.len() > FIELDS_MAX {
            return Err(HandleError::TooManyFields);
        }

        let file_system_id = fields[0];
        if !has_token(file_system_id, FILE_SYSTEM_ID_PREFIX) {
            return Err(HandleError::InvalidFileSystemId);
        }

        let export_path = fields
            .get(1)
            .filter(|path| !path.is_empty())
            .map(|path| clean_path(path));

        let access_point_id = match fields.get(2).filter(|id| !id.is_empty()) {
            Some(id) if is_access_point_id(id) => Some(id.to_string()),
            Some(id) => {
                return Err(HandleError::InvalidAccessPointId { id: id.to_string() });
            }
            None => None,
        };

        Ok(Self {
            file_system_id: file_system_id.to_string(),
            export_path,
            access_point_id,
        })
    }

    pub fn file_system_id(&self) -> &str {
        &self.file_system_id
    }

    /// The normalized export path, `/` if the handle did not name one.
    pub fn export_path(&self) -> &str {
        self.export_path.as_deref().unwrap_or(DEFAULT_EXPORT_PATH)
    }

    /// Whether the handle named an export path itself.
    pub fn has_explicit_path(&self) -> bool {
        self.export_path.is_some()
    }

    pub fn access_point_id(&self) -> Option<&str> {
        self.access_point_id.as_deref()
    }
}

impl FromStr for VolumeHandle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encodes the handle back into its wire form, omitting empty trailing
/// fields.
impl fmt::Display for VolumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_system_id)?;
        match (&self.export_path, &self.access_point_id) {
            (path, Some(ap)) => write!(f, ":{}:{ap}", path.as_deref().unwrap_or("")),
            (Some(path), None) => write!(f, ":{path}"),
            (None, None) => Ok(()),
        }
    }
}

/// Whether `id` has the `fsap-<token>` form of an access point ID.
pub(crate) fn is_access_point_id(id: &str) -> bool {
    has_token(id, ACCESS_POINT_ID_PREFIX)
}

fn has_token(field: &str, prefix: &str) -> bool {
    field
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty())
}

/// Lexically normalize a slash-separated path.
///
/// Mirrors the usual "clean" rules: empty and `.` elements are dropped, `..`
/// removes the preceding element (or is dropped at the root of an absolute
/// path, or kept at the front of a relative one). An empty result becomes
/// `.` for relative paths and `/` for absolute ones.
pub(crate) fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
