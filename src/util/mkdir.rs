use anyhow::{Context, Result, anyhow};
use log::info;
use nix::errno::Errno;
use nix::sys::stat::SFlag;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

/* rwxr-xr-x, the mode every mount point and placeholder file is created
 * with. */
const MOUNT_POINT_MODE: u32 = 0o755;

/* Ensures a directory exists at `path`, creating the whole chain if needed.
 * An existing directory is fine; anything else at that path is an error. */
pub fn check_and_make_dir(path: &Path) -> Result<()> {
    match nix::sys::stat::stat(path) {
        Ok(st) => {
            if st.st_mode & SFlag::S_IFMT.bits() == SFlag::S_IFDIR.bits() {
                info!(
                    "Mount point '{}' already exists, no need to mkdir",
                    path.display()
                );
                Ok(())
            } else {
                Err(anyhow!(
                    "Mount point '{}' already exists but is not a directory",
                    path.display()
                ))
            }
        }
        Err(Errno::ENOENT) => std::fs::DirBuilder::new()
            .recursive(true)
            .mode(MOUNT_POINT_MODE)
            .create(path)
            .with_context(|| {
                format!("failed to create mount point '{}'", path.display())
            }),
        Err(e) => Err(anyhow!(
            "Failed to access mount point '{}': {}",
            path.display(),
            e
        )),
    }
}

/* Ensures a regular file exists at `path` so a file bind mount has
 * something to attach to. Missing parent directories are created first. */
pub fn check_and_create_file(path: &Path) -> Result<()> {
    if path.exists() {
        info!(
            "Mount file '{}' already exists, no need to create",
            path.display()
        );
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        check_and_make_dir(parent)?;
    }

    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(MOUNT_POINT_MODE)
        .open(path)
        .map(|_| ())
        .with_context(|| {
            format!("failed to create mount file '{}'", path.display())
        })
}
