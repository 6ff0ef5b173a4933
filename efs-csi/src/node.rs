//! CSI Node service implementation.
//!
//! Thin gRPC layer that delegates to DriverState for business logic.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use crate::csi;
use crate::csi::volume_capability::{AccessType, access_mode::Mode};
use crate::driver::DriverState;
use crate::error::{self, Error, Require};

/// Access modes an EFS mount can serve.
const SUPPORTED_ACCESS_MODES: [Mode; 3] = [
    Mode::SingleNodeWriter,
    Mode::MultiNodeReaderOnly,
    Mode::MultiNodeMultiWriter,
];

pub struct NodeService {
    state: Arc<DriverState>,
}

impl NodeService {
    pub fn new(state: Arc<DriverState>) -> Self {
        Self { state }
    }
}

/// Check that `cap` asks for a filesystem mount in a supported access mode
/// and return its mount flags.
fn mount_flags(cap: csi::VolumeCapability) -> error::Result<Vec<String>> {
    let mode = cap
        .access_mode
        .as_ref()
        .map(|m| m.mode())
        .unwrap_or(Mode::Unknown);
    if !SUPPORTED_ACCESS_MODES.contains(&mode) {
        return Err(Error::UnsupportedCapability);
    }

    match cap.access_type {
        Some(AccessType::Mount(mount)) => Ok(mount.mount_flags),
        Some(AccessType::Block(_)) | None => Err(Error::UnsupportedCapability),
    }
}

#[tonic::async_trait]
impl csi::node_server::Node for NodeService {
    async fn node_stage_volume(
        &self,
        _request: Request<csi::NodeStageVolumeRequest>,
    ) -> Result<Response<csi::NodeStageVolumeResponse>, Status> {
        Err(Status::unimplemented("NodeStageVolume is not implemented"))
    }

    async fn node_unstage_volume(
        &self,
        _request: Request<csi::NodeUnstageVolumeRequest>,
    ) -> Result<Response<csi::NodeUnstageVolumeResponse>, Status> {
        Err(Status::unimplemented(
            "NodeUnstageVolume is not implemented",
        ))
    }

    async fn node_publish_volume(
        &self,
        request: Request<csi::NodePublishVolumeRequest>,
    ) -> Result<Response<csi::NodePublishVolumeResponse>, Status> {
        let req = request.into_inner();
        debug!(volume_id = %req.volume_id, target = %req.target_path, "NodePublishVolume");

        let target_path = req.target_path.require("target path")?;
        let volume_cap = req.volume_capability.require("volume capability")?;
        let flags = mount_flags(volume_cap)?;

        self.state
            .publish_volume(
                &req.volume_id,
                &target_path,
                &req.volume_context,
                &flags,
                req.readonly,
            )
            .await?;

        Ok(Response::new(csi::NodePublishVolumeResponse {}))
    }

    async fn node_unpublish_volume(
        &self,
        request: Request<csi::NodeUnpublishVolumeRequest>,
    ) -> Result<Response<csi::NodeUnpublishVolumeResponse>, Status> {
        let req = request.into_inner();
        debug!(volume_id = %req.volume_id, target = %req.target_path, "NodeUnpublishVolume");

        let target_path = req.target_path.require("target path")?;

        self.state
            .unpublish_volume(&req.volume_id, &target_path)
            .await?;
        Ok(Response::new(csi::NodeUnpublishVolumeResponse {}))
    }

    async fn node_get_volume_stats(
        &self,
        _request: Request<csi::NodeGetVolumeStatsRequest>,
    ) -> Result<Response<csi::NodeGetVolumeStatsResponse>, Status> {
        Err(Status::unimplemented(
            "NodeGetVolumeStats is not implemented",
        ))
    }

    async fn node_expand_volume(
        &self,
        _request: Request<csi::NodeExpandVolumeRequest>,
    ) -> Result<Response<csi::NodeExpandVolumeResponse>, Status> {
        Err(Status::unimplemented("NodeExpandVolume is not implemented"))
    }

    async fn node_get_capabilities(
        &self,
        _request: Request<csi::NodeGetCapabilitiesRequest>,
    ) -> Result<Response<csi::NodeGetCapabilitiesResponse>, Status> {
        Ok(Response::new(csi::NodeGetCapabilitiesResponse {
            capabilities: vec![],
        }))
    }

    async fn node_get_info(
        &self,
        _request: Request<csi::NodeGetInfoRequest>,
    ) -> Result<Response<csi::NodeGetInfoResponse>, Status> {
        Ok(Response::new(csi::NodeGetInfoResponse {
            node_id: self.state.config.node_id.clone(),
            max_volumes_per_node: 0,
            accessible_topology: None,
        }))
    }
}
