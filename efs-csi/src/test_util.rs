//! Shared test utilities for CSI driver tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use crate::driver::{Config, DRIVER_NAME, DRIVER_VERSION, DriverState};
use crate::identity::IdentityService;
use crate::mounter::Mounter;
use crate::node::NodeService;

/// A host operation observed by [`FakeMounter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MounterCall {
    EnsureDir(PathBuf),
    Mount {
        source: String,
        target: PathBuf,
        fs_type: String,
        options: Vec<String>,
    },
    Unmount(PathBuf),
    DeviceRefCount(PathBuf),
}

/// An injected failure. `remaining: None` fails every call.
#[derive(Debug)]
struct Failure {
    message: String,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct FailureSlot(Mutex<Option<Failure>>);

impl FailureSlot {
    fn set(&mut self, message: &str, remaining: Option<usize>) {
        *self.0.get_mut().unwrap() = Some(Failure {
            message: message.to_string(),
            remaining,
        });
    }

    fn check(&self) -> io::Result<()> {
        let mut slot = self.0.lock().unwrap();
        let Some(failure) = slot.as_mut() else {
            return Ok(());
        };
        let err = io::Error::other(failure.message.clone());
        let exhausted = match &mut failure.remaining {
            None => false,
            Some(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
        };
        if exhausted {
            *slot = None;
        }
        Err(err)
    }
}

/// In-memory [`Mounter`] that records every call and fails on demand.
///
/// The reference count behaves like the host mount table: a successful
/// `unmount` drops it by one, and unmounting a target with no references
/// fails the way `umount` does.
#[derive(Debug, Default)]
pub struct FakeMounter {
    calls: Mutex<Vec<MounterCall>>,
    ref_count: Mutex<usize>,
    ensure_dir_error: FailureSlot,
    mount_error: FailureSlot,
    unmount_error: FailureSlot,
    ref_count_error: FailureSlot,
    ref_count_barrier: Option<(Barrier, usize)>,
    ref_count_waits: AtomicUsize,
}

impl FakeMounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ref_count(mut self, refs: usize) -> Self {
        *self.ref_count.get_mut().unwrap() = refs;
        self
    }

    /// Hold the first `n` refcount reads until all `n` have arrived, so
    /// concurrent callers all observe the same count.
    pub fn sync_ref_count_reads(mut self, n: usize) -> Self {
        self.ref_count_barrier = Some((Barrier::new(n), n));
        self
    }

    pub fn fail_ensure_dir(mut self, msg: &str) -> Self {
        self.ensure_dir_error.set(msg, None);
        self
    }

    pub fn fail_mount(mut self, msg: &str) -> Self {
        self.mount_error.set(msg, None);
        self
    }

    /// Fail the next mount only.
    pub fn fail_mount_once(mut self, msg: &str) -> Self {
        self.mount_error.set(msg, Some(1));
        self
    }

    pub fn fail_unmount(mut self, msg: &str) -> Self {
        self.unmount_error.set(msg, None);
        self
    }

    pub fn fail_device_ref_count(mut self, msg: &str) -> Self {
        self.ref_count_error.set(msg, None);
        self
    }

    pub fn calls(&self) -> Vec<MounterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ref_count(&self) -> usize {
        *self.ref_count.lock().unwrap()
    }

    fn record(&self, call: MounterCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Mounter for FakeMounter {
    fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        self.record(MounterCall::EnsureDir(path.to_path_buf()));
        self.ensure_dir_error.check()
    }

    fn mount(
        &self,
        source: &str,
        target: &Path,
        fs_type: &str,
        options: &[String],
    ) -> io::Result<()> {
        self.record(MounterCall::Mount {
            source: source.to_string(),
            target: target.to_path_buf(),
            fs_type: fs_type.to_string(),
            options: options.to_vec(),
        });
        self.mount_error.check()
    }

    fn unmount(&self, target: &Path) -> io::Result<()> {
        self.record(MounterCall::Unmount(target.to_path_buf()));
        self.unmount_error.check()?;

        let mut refs = self.ref_count.lock().unwrap();
        if *refs == 0 {
            return Err(io::Error::other(format!(
                "umount: {}: not mounted.",
                target.display()
            )));
        }
        *refs -= 1;
        Ok(())
    }

    fn device_ref_count(&self, path: &Path) -> io::Result<(String, usize)> {
        self.record(MounterCall::DeviceRefCount(path.to_path_buf()));
        self.ref_count_error.check()?;

        if let Some((barrier, n)) = &self.ref_count_barrier
            && self.ref_count_waits.fetch_add(1, Ordering::SeqCst) < *n
        {
            barrier.wait();
        }

        let refs = self.ref_count();
        let device = if refs > 0 {
            "fs-abc123.efs.us-east-1.amazonaws.com:/".to_string()
        } else {
            String::new()
        };
        Ok((device, refs))
    }
}

/// Test fixture providing isolated driver state backed by a [`FakeMounter`].
pub struct TestFixture {
    pub state: Arc<DriverState>,
    mounter: Arc<FakeMounter>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_mounter(FakeMounter::new())
    }

    pub fn with_mounter(mounter: FakeMounter) -> Self {
        let config = Config {
            name: DRIVER_NAME.to_string(),
            version: DRIVER_VERSION.to_string(),
            node_id: "test-node".to_string(),
            endpoint: "unix:///tmp/test.sock".to_string(),
        };
        let mounter = Arc::new(mounter);
        let state = Arc::new(DriverState::new(
            config,
            Arc::clone(&mounter) as Arc<dyn Mounter>,
        ));
        Self { state, mounter }
    }

    pub fn identity_service(&self) -> IdentityService {
        IdentityService::new(Arc::clone(&self.state))
    }

    pub fn node_service(&self) -> NodeService {
        NodeService::new(Arc::clone(&self.state))
    }

    /// Host operations performed so far, in order.
    pub fn calls(&self) -> Vec<MounterCall> {
        self.mounter.calls()
    }

    pub fn ref_count(&self) -> usize {
        self.mounter.ref_count()
    }

    pub fn count(&self, pred: impl Fn(&MounterCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}
