//! efs-csi: CSI node plugin for Amazon EFS.
//!
//! This crate implements the Identity and Node services of the Container
//! Storage Interface (CSI) specification. Publishing a volume mounts an EFS
//! file system (optionally through an access point) at the requested target
//! path; unpublishing unmounts it.

// Generated protobuf code has doc formatting issues
#![allow(clippy::doc_overindented_list_items)]
#![allow(clippy::doc_lazy_continuation)]
// tonic::Status is large by design (176 bytes)
#![allow(clippy::result_large_err)]

pub mod driver;
pub mod error;
pub mod identity;
pub mod mounter;
pub mod node;
pub mod options;
pub mod types;

pub mod csi {
    tonic::include_proto!("csi.v1");

    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("csi_descriptor");
}

pub use driver::{Config, Driver};
pub use error::{Error, Result};
pub use mounter::{Mounter, SystemMounter};
pub use types::VolumeHandle;

#[cfg(test)]
pub(crate) mod test_util;
