use anyhow::{Context, Result, anyhow};
use log::error;
use nix::sched::{CloneFlags, setns, unshare};
use std::fs::File;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::Path;
use std::sync::Mutex;

pub const SELF_MOUNT_NAMESPACE: &str = "/proc/self/ns/mnt";

/* The mount namespace this process occupied before any sandbox work. Held
 * so the CLI can hop back out of a freshly-built namespace and enter the
 * sandbox through the same captured handle a foreign process would use. */
static DEFAULT_NAMESPACE: Mutex<Option<OwnedFd>> = Mutex::new(None);

/* Opens a read-only handle on a /proc/.../ns/mnt path. The handle closes
 * when the returned fd is dropped. */
pub fn open_mount_namespace<P: AsRef<Path>>(path: P) -> Result<OwnedFd> {
    let file = File::open(path.as_ref()).with_context(|| {
        format!(
            "failed to open namespace handle '{}'",
            path.as_ref().display()
        )
    })?;
    Ok(OwnedFd::from(file))
}

/* Detaches the calling thread into a new mount namespace. Only the mount
 * namespace kind is exposed; nothing else is ever unshared here. */
pub fn unshare_mount_namespace() -> Result<()> {
    unshare(CloneFlags::CLONE_NEWNS).map_err(|e| {
        error!("Failed to unshare mount namespace: {}", e);
        anyhow!("failed to unshare mount namespace: {}", e)
    })
}

pub fn join_mount_namespace(handle: BorrowedFd) -> Result<()> {
    setns(handle, CloneFlags::CLONE_NEWNS)
        .context("failed to join mount namespace")
}

/* Captures the current mount namespace as the default. Idempotent: a handle
 * already held is kept, never re-captured. */
pub fn init_default_namespace() -> Result<()> {
    let mut slot = DEFAULT_NAMESPACE
        .lock()
        .expect("Failed to lock DEFAULT_NAMESPACE");
    if slot.is_none() {
        *slot = Some(open_mount_namespace(SELF_MOUNT_NAMESPACE)?);
    }
    Ok(())
}

pub fn enter_default_namespace() -> Result<()> {
    let slot = DEFAULT_NAMESPACE
        .lock()
        .expect("Failed to lock DEFAULT_NAMESPACE");
    match slot.as_ref() {
        Some(handle) => join_mount_namespace(handle.as_fd())
            .context("failed to enter the default namespace"),
        None => Err(anyhow!("default namespace has not been captured")),
    }
}

pub fn close_default_namespace() {
    DEFAULT_NAMESPACE
        .lock()
        .expect("Failed to lock DEFAULT_NAMESPACE")
        .take();
}
