//! CSI Identity service implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::csi;
use crate::driver::DriverState;

pub struct IdentityService {
    state: Arc<DriverState>,
}

impl IdentityService {
    pub fn new(state: Arc<DriverState>) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl csi::identity_server::Identity for IdentityService {
    async fn get_plugin_info(
        &self,
        _request: Request<csi::GetPluginInfoRequest>,
    ) -> Result<Response<csi::GetPluginInfoResponse>, Status> {
        Ok(Response::new(csi::GetPluginInfoResponse {
            name: self.state.config.name.clone(),
            vendor_version: self.state.config.version.clone(),
            manifest: Default::default(),
        }))
    }

    /// Node-only plugin: no controller service, no topology constraints.
    async fn get_plugin_capabilities(
        &self,
        _request: Request<csi::GetPluginCapabilitiesRequest>,
    ) -> Result<Response<csi::GetPluginCapabilitiesResponse>, Status> {
        Ok(Response::new(csi::GetPluginCapabilitiesResponse {
            capabilities: vec![],
        }))
    }

    async fn probe(
        &self,
        _request: Request<csi::ProbeRequest>,
    ) -> Result<Response<csi::ProbeResponse>, Status> {
        Ok(Response::new(csi::ProbeResponse { ready: Some(true) }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csi;
    use crate::test_util::TestFixture;

    #[tokio::test]
    async fn get_plugin_info_returns_driver_name_and_version() {
        let fixture = TestFixture::new();
        let service = fixture.identity_service();

        let response = csi::identity_server::Identity::get_plugin_info(
            &service,
            Request::new(csi::GetPluginInfoRequest {}),
        )
        .await
        .expect("GetPluginInfo should succeed");

        let info = response.into_inner();

        assert_eq!(info.name, "efs.csi.aws.com");
        assert_eq!(info.vendor_version, env!("CARGO_PKG_VERSION"));
        assert!(info.manifest.is_empty());
    }

    #[tokio::test]
    async fn get_plugin_capabilities_is_empty() {
        let fixture = TestFixture::new();
        let service = fixture.identity_service();

        let response = csi::identity_server::Identity::get_plugin_capabilities(
            &service,
            Request::new(csi::GetPluginCapabilitiesRequest {}),
        )
        .await
        .expect("GetPluginCapabilities should succeed");

        assert!(response.into_inner().capabilities.is_empty());
    }

    #[tokio::test]
    async fn probe_reports_ready() {
        let fixture = TestFixture::new();
        let service = fixture.identity_service();

        let response =
            csi::identity_server::Identity::probe(&service, Request::new(csi::ProbeRequest {}))
                .await
                .expect("Probe should succeed");

        assert_eq!(response.into_inner().ready, Some(true));
    }
}
