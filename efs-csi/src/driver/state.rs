//! Driver state and the publish/unpublish sequencing.
//!
//! `DriverState` holds nothing mutable: configuration and a handle to the
//! host [`Mounter`]. The host mount table is the only source of truth for
//! what is mounted, and it is read fresh on every call.
//!
//! The orchestrator sends at most one publish or unpublish per volume per
//! node at a time. The refcount check in `unpublish_volume` is not atomic
//! with the unmount that follows; when two unpublish calls still race, the
//! loser's unmount fails, a second refcount read finds the target gone and
//! the call succeeds.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mounter::Mounter;
use crate::options::{self, MountRequest};
use crate::types::VolumeHandle;

use super::Config;

/// Shared driver state.
pub struct DriverState {
    pub config: Config,
    mounter: Arc<dyn Mounter>,
}

impl DriverState {
    pub fn new(config: Config, mounter: Arc<dyn Mounter>) -> Self {
        Self { config, mounter }
    }

    /// Publish a volume: decode the handle, resolve mount options, create
    /// the target directory and mount.
    ///
    /// Retrying after a failure is safe; both host steps are idempotent.
    pub async fn publish_volume(
        &self,
        volume_id: &str,
        target_path: &str,
        volume_context: &HashMap<String, String>,
        mount_flags: &[String],
        readonly: bool,
    ) -> Result<()> {
        let handle = VolumeHandle::parse(volume_id)
            .map_err(|reason| Error::invalid_volume_id(volume_id, reason))?;

        let request =
            options::resolve(&handle, volume_context, mount_flags, readonly, target_path)?;

        debug!(
            volume_id,
            source = %request.source,
            target = %request.target,
            options = ?request.options,
            "resolved mount"
        );

        let target = PathBuf::from(&request.target);
        self.run_blocking(move |m| m.ensure_dir(&target))
            .await
            .map_err(|source| Error::CreateDir {
                target: request.target.clone(),
                source,
            })?;

        self.mount(&request).await?;

        info!(volume_id, target = target_path, "volume published");
        Ok(())
    }

    /// Unpublish a volume: unmount the target unless nothing is mounted
    /// there any more.
    pub async fn unpublish_volume(&self, volume_id: &str, target_path: &str) -> Result<()> {
        let target = PathBuf::from(target_path);

        let (device, refs) = self
            .run_blocking({
                let target = target.clone();
                move |m| m.device_ref_count(&target)
            })
            .await
            .map_err(Error::MountCheck)?;

        if refs == 0 {
            debug!(
                volume_id,
                target = target_path,
                "target not mounted, nothing to do"
            );
            return Ok(());
        }

        debug!(volume_id, target = target_path, device, refs, "unmounting");
        let unmounted = self
            .run_blocking({
                let target = target.clone();
                move |m| m.unmount(&target)
            })
            .await;

        if let Err(source) = unmounted {
            // A racing unpublish may have unmounted the target first.
            if !self.still_mounted(&target).await {
                debug!(
                    volume_id,
                    target = target_path,
                    error = %source,
                    "target already unmounted"
                );
                return Ok(());
            }
            return Err(Error::Unmount {
                target: target_path.to_string(),
                source,
            });
        }

        info!(volume_id, target = target_path, "volume unpublished");
        Ok(())
    }

    /// Whether anything is still mounted at `target`. A failed lookup counts
    /// as mounted.
    async fn still_mounted(&self, target: &Path) -> bool {
        let target = target.to_path_buf();
        let recheck = self
            .run_blocking(move |m| m.device_ref_count(&target))
            .await;
        match recheck {
            Ok((_, refs)) => refs > 0,
            Err(e) => {
                warn!(error = %e, "failed to re-check mount after unmount failure");
                true
            }
        }
    }

    async fn mount(&self, request: &MountRequest) -> Result<()> {
        let source = request.source.clone();
        let target = PathBuf::from(&request.target);
        let fs_type = request.fs_type;
        let options = request.options.clone();

        self.run_blocking(move |m| m.mount(&source, &target, fs_type, &options))
            .await
            .map_err(|source| Error::Mount {
                mount_source: request.source.clone(),
                target: request.target.clone(),
                source,
            })
    }

    /// Run a mounter call on the blocking pool.
    ///
    /// Mount helpers can block for a long time on network I/O, so they must
    /// not run on the async worker threads.
    async fn run_blocking<T, F>(&self, f: F) -> io::Result<T>
    where
        F: FnOnce(&dyn Mounter) -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mounter = Arc::clone(&self.mounter);
        tokio::task::spawn_blocking(move || f(mounter.as_ref()))
            .await
            .map_err(|e| io::Error::other(format!("task join error: {e}")))?
    }
}
