//! CSI driver implementation.
//!
//! This module contains the core driver components:
//! - `Config`: Driver configuration
//! - `Driver`: The main CSI driver that runs the gRPC server
//! - `DriverState`: Shared state and the publish/unpublish sequencing (in `state` submodule)

mod state;

pub use state::DriverState;

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tonic::transport::Server;
use tracing::{debug, info};

use crate::csi::{FILE_DESCRIPTOR_SET, identity_server::IdentityServer, node_server::NodeServer};
use crate::error::{Error, Result};
use crate::identity::IdentityService;
use crate::mounter::{Mounter, SystemMounter};
use crate::node::NodeService;

pub const DRIVER_NAME: &str = "efs.csi.aws.com";
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/csi/csi.sock";

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub version: String,
    pub node_id: String,
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DRIVER_NAME.to_string(),
            version: DRIVER_VERSION.to_string(),
            node_id: default_node_id(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// The host name, or `unknown` if it cannot be read.
pub fn default_node_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// The CSI driver.
pub struct Driver {
    state: Arc<DriverState>,
}

impl Driver {
    /// A driver that mounts through the host's mount helpers.
    pub fn new(config: Config) -> Self {
        Self::with_mounter(config, Arc::new(SystemMounter))
    }

    pub fn with_mounter(config: Config, mounter: Arc<dyn Mounter>) -> Self {
        Self {
            state: Arc::new(DriverState::new(config, mounter)),
        }
    }

    /// Serve the Identity and Node services until the server stops.
    pub async fn run(&self) -> Result<()> {
        let endpoint = &self.state.config.endpoint;
        info!(
            name = %self.state.config.name,
            version = %self.state.config.version,
            node_id = %self.state.config.node_id,
            endpoint,
            "starting CSI driver"
        );

        if let Some(path) = endpoint.strip_prefix("unix://") {
            self.run_unix(path).await
        } else if let Some(addr) = endpoint.strip_prefix("tcp://") {
            let addr: SocketAddr = addr.parse().map_err(|_| Error::InvalidEndpoint {
                endpoint: endpoint.clone(),
            })?;
            self.run_tcp(addr).await
        } else {
            Err(Error::InvalidEndpoint {
                endpoint: endpoint.clone(),
            })
        }
    }

    async fn run_unix(&self, path: &str) -> Result<()> {
        // A stale socket from a previous run blocks bind.
        if fs::remove_file(path).is_ok() {
            debug!(path, "removed stale socket");
        }
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(path)?;
        let incoming = tokio_stream::wrappers::UnixListenerStream::new(listener);

        self.serve_grpc(incoming).await
    }

    async fn run_tcp(&self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);

        self.serve_grpc(incoming).await
    }

    async fn serve_grpc<S, IO, E>(&self, incoming: S) -> Result<()>
    where
        S: tokio_stream::Stream<Item = std::result::Result<IO, E>> + Send + 'static,
        IO: tokio::io::AsyncRead
            + tokio::io::AsyncWrite
            + tonic::transport::server::Connected
            + Send
            + Unpin
            + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        Server::builder()
            .add_service(reflection)
            .add_service(IdentityServer::new(IdentityService::new(
                self.state.clone(),
            )))
            .add_service(NodeServer::new(NodeService::new(self.state.clone())))
            .serve_with_incoming(incoming)
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_names_the_driver() {
        let config = Config::default();
        assert_eq!(config.name, "efs.csi.aws.com");
        assert_eq!(config.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(!config.node_id.is_empty());
    }

    #[tokio::test]
    async fn run_rejects_unknown_endpoint_scheme() {
        let config = Config {
            endpoint: "http://localhost:10000".to_string(),
            ..Default::default()
        };
        let err = Driver::new(config).run().await.unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
        assert_eq!(err.to_string(), "invalid endpoint: http://localhost:10000");
    }

    #[tokio::test]
    async fn run_rejects_malformed_tcp_address() {
        let config = Config {
            endpoint: "tcp://not-an-address".to_string(),
            ..Default::default()
        };
        let err = Driver::new(config).run().await.unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint { .. }));
    }
}
