//! Error types for the CSI driver.

use std::io;
use thiserror::Error;
use tonic::Status;

use crate::types::HandleError;

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for validating required fields.
///
/// Missing or empty fields become [`Error::Missing`], which maps to
/// `INVALID_ARGUMENT`.
pub trait Require<T> {
    fn require(self, name: &'static str) -> Result<T>;
}

impl Require<String> for String {
    fn require(self, name: &'static str) -> Result<String> {
        if self.is_empty() {
            Err(Error::Missing(name))
        } else {
            Ok(self)
        }
    }
}

impl<T> Require<T> for Option<T> {
    fn require(self, name: &'static str) -> Result<T> {
        self.ok_or(Error::Missing(name))
    }
}

/// CSI driver errors with structured context.
///
/// The `Display` text of each variant is the message returned to the
/// orchestrator, so it must stay single-line and stable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not provided")]
    Missing(&'static str),

    #[error("volume capability not supported")]
    UnsupportedCapability,

    #[error("volume ID '{volume_id}' is invalid: {reason}")]
    InvalidVolumeId {
        volume_id: String,
        #[source]
        reason: HandleError,
    },

    #[error(
        "volume ID '{volume_id}' has an invalid access point ID '{access_point_id}': {reason}"
    )]
    InvalidAccessPointId {
        volume_id: String,
        access_point_id: String,
        #[source]
        reason: HandleError,
    },

    #[error(
        "mount option accesspoint has an invalid access point ID '{access_point_id}': expected it to be of the form 'fsap-...'"
    )]
    InvalidMountOptionAccessPoint { access_point_id: String },

    #[error("volume context property {0} not supported")]
    UnsupportedVolumeContext(String),

    #[error("volume context property \"path\" must be an absolute path")]
    RelativeContextPath,

    #[error(
        "found conflicting access point IDs in mountOptions ({mount_options}) and volumeHandle ({volume_handle})"
    )]
    ConflictingAccessPoints {
        mount_options: String,
        volume_handle: String,
    },

    #[error(
        "found conflicting access point IDs in mountOptions ({first}) and ({second})"
    )]
    ConflictingMountOptionAccessPoints { first: String, second: String },

    #[error("could not create dir \"{target}\": {source}")]
    CreateDir {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("could not mount \"{mount_source}\" at \"{target}\": {source}")]
    Mount {
        mount_source: String,
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("could not unmount \"{target}\": {source}")]
    Unmount { target: String, source: io::Error },

    #[error("failed to check if volume is mounted: {0}")]
    MountCheck(#[source] io::Error),

    #[error("invalid endpoint: {endpoint}")]
    InvalidEndpoint { endpoint: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap a volume handle decode failure with the raw volume ID.
    pub fn invalid_volume_id(volume_id: &str, reason: HandleError) -> Self {
        let volume_id = volume_id.to_string();
        match reason.clone() {
            HandleError::InvalidAccessPointId { id } => Error::InvalidAccessPointId {
                volume_id,
                access_point_id: id,
                reason,
            },
            HandleError::TooManyFields | HandleError::InvalidFileSystemId => {
                Error::InvalidVolumeId { volume_id, reason }
            }
        }
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        match &err {
            // INVALID_ARGUMENT: the request must change before a retry can succeed
            Error::Missing(_)
            | Error::UnsupportedCapability
            | Error::InvalidVolumeId { .. }
            | Error::InvalidAccessPointId { .. }
            | Error::InvalidMountOptionAccessPoint { .. }
            | Error::UnsupportedVolumeContext(_)
            | Error::RelativeContextPath
            | Error::ConflictingAccessPoints { .. }
            | Error::ConflictingMountOptionAccessPoints { .. }
            | Error::InvalidEndpoint { .. } => Status::invalid_argument(err.to_string()),

            // INTERNAL: host operation failed, the caller may retry
            Error::CreateDir { .. }
            | Error::Mount { .. }
            | Error::Unmount { .. }
            | Error::MountCheck(_)
            | Error::Io(_) => Status::internal(err.to_string()),
        }
    }
}
