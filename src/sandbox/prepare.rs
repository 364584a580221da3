use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use nix::errno::Errno;
use nix::mount::{MntFlags, MsFlags, umount2};
use nix::unistd::{Uid, chdir, pivot_root};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use super::{LinkList, MountKind, MountList, Sandbox};
use crate::util::{check_and_create_file, check_and_make_dir, mount, mount_raw};

impl Sandbox {
    /* Turns the parsed mount plan into kernel mount-namespace state. The
     * pipeline is fail-fast: a fatal step leaves everything applied so far
     * in place, and full recovery is process exit (which tears the
     * namespace down), not surgical unmounting. */
    pub fn prepare(&mut self) -> Result<()> {
        if !Uid::effective().is_root() {
            return Err(anyhow!(
                "preparing sandbox '{}' requires effective uid 0",
                self.role
            ));
        }
        let Some(root_path) = self.root_path.clone() else {
            return Err(anyhow!(
                "sandbox '{}' has no root path configured",
                self.role
            ));
        };
        if self.is_created {
            info!("Sandbox '{}' already created", self.role);
            return Ok(());
        }

        let root = Path::new(&root_path);
        check_and_make_dir(root).with_context(|| {
            format!("failed to prepare sandbox root {}", root_path)
        })?;

        /* Nothing this process does to mounts from here on may propagate to
         * the rest of the system, and pivot_root() refuses to operate on a
         * shared mount tree.
         *
         * source: pivot_root(2) man page
         */
        mount(None, Path::new("/"), MsFlags::MS_REC | MsFlags::MS_SLAVE)
            .context("failed to make the mount tree recursive-slave")?;

        /* Ensure the future root is a mount point. */
        bind_mount(
            &root_path,
            root,
            MsFlags::MS_BIND | MsFlags::MS_REC,
            MountKind::Path,
        )
        .context("failed to self-bind the sandbox root")?;

        mount_entries(&self.path_mounts, &root_path)?;
        mount_entries(&self.file_mounts, &root_path)?;

        link_entries(&self.links, &root_path)?;

        chdir(root)
            .with_context(|| format!("failed to chdir to {}", root_path))?;
        /* Self-pivot: the old root is stacked beneath the new one at the
         * same path, so no staging directory is needed, and it is then
         * lazily detached. */
        pivot_root(root, root)
            .with_context(|| format!("failed to pivot_root to {}", root_path))?;
        umount2(".", MntFlags::MNT_DETACH)
            .context("failed to detach the old root")?;

        self.is_created = true;
        Ok(())
    }
}

/* Binds one source onto a target, creating the target first according to
 * its kind. The kernel's "not a directory" complaint is always tolerated;
 * the caller decides what any other failure means. */
fn bind_mount(
    source: &str,
    target: &Path,
    flags: MsFlags,
    kind: MountKind,
) -> Result<()> {
    match kind {
        MountKind::Path => check_and_make_dir(target)?,
        MountKind::File => check_and_create_file(target)?,
    }

    let mut flags = flags;
    if !flags.contains(MsFlags::MS_BIND) {
        warn!(
            "Mount of {} does not configure the bind flag, adding it",
            target.display()
        );
        flags |= MsFlags::MS_BIND;
    }
    if !flags.contains(MsFlags::MS_REC) {
        warn!(
            "Mount of {} does not configure the rec flag, adding it",
            target.display()
        );
        flags |= MsFlags::MS_REC;
    }

    match mount_raw(Some(Path::new(source)), target, flags) {
        Ok(()) => Ok(()),
        Err(Errno::ENOTDIR) => {
            warn!(
                "Bind mount target {} is not a directory, ignoring",
                target.display()
            );
            Ok(())
        }
        Err(e) => Err(anyhow!(
            "failed to bind mount '{}' to '{}': {}",
            source,
            target.display(),
            e
        )),
    }
}

fn mount_entries(mounts: &MountList, root_path: &str) -> Result<()> {
    for entry in mounts.iter() {
        /* Targets in the policy are absolute inside the sandbox; plain
         * concatenation places them under the root. */
        let target = PathBuf::from(format!("{}{}", root_path, entry.target));
        if let Err(e) =
            bind_mount(&entry.source, &target, entry.flags, entry.kind)
        {
            warn!(
                "Failed to bind mount {} to {}",
                entry.source,
                target.display()
            );
            if !entry.ignore_errors {
                return Err(e);
            }
        }
    }
    Ok(())
}

fn link_entries(links: &LinkList, root_path: &str) -> Result<()> {
    for entry in links.iter() {
        let link_name =
            PathBuf::from(format!("{}{}", root_path, entry.link_name));
        match symlink(&entry.target, &link_name) {
            Ok(()) => (),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(
                    "Symbol link name '{}' already exists",
                    link_name.display()
                );
            }
            Err(e) => {
                return Err(anyhow!(
                    "failed to link '{}' to '{}': {}",
                    entry.target,
                    link_name.display(),
                    e
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{LinkEntry, MountEntry, Role};
    use std::path::PathBuf;

    fn scratch(tag: &str) -> PathBuf {
        PathBuf::from(format!(
            "/tmp/sandboxctl-tests-prepare-{}-{}",
            tag,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn test_prepare_without_root_path_fails() {
        /* Fails under any uid: non-root trips the permission gate, root
         * trips the missing-root gate. Neither touches the kernel. */
        let mut sandbox = Sandbox::new(Role::System);
        assert!(sandbox.prepare().is_err());
        assert!(!sandbox.is_created);
    }

    #[test]
    fn test_prepare_gates_before_mounting() {
        let root = scratch("gate");
        let mut sandbox = Sandbox::new(Role::System);
        sandbox.root_path = Some(root.to_string_lossy().to_string());

        if Uid::effective().is_root() {
            /* Already-created sandboxes return success without re-running
             * any build step: the root directory is never even created. */
            sandbox.is_created = true;
            assert!(sandbox.prepare().is_ok());
            assert!(!root.exists());
        } else {
            /* Without uid 0 nothing is touched at all. */
            assert!(sandbox.prepare().is_err());
            assert!(!root.exists());
            assert!(!sandbox.is_created);
        }
    }

    #[test]
    fn test_bind_mount_creates_file_target() {
        let target = scratch("file-target").join("placeholder");
        let result = bind_mount(
            "/nonexistent-source",
            &target,
            MsFlags::MS_BIND,
            MountKind::File,
        );
        /* The mount itself fails (missing source or missing privilege) but
         * the target file was prepared first. */
        assert!(result.is_err());
        assert!(target.is_file());
        std::fs::remove_dir_all(target.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_bind_mount_creates_directory_target() {
        let target = scratch("dir-target").join("point");
        let result = bind_mount(
            "/nonexistent-source",
            &target,
            MsFlags::MS_BIND | MsFlags::MS_REC,
            MountKind::Path,
        );
        assert!(result.is_err());
        assert!(target.is_dir());
        std::fs::remove_dir_all(target.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_ignore_errors_tolerates_a_failing_entry() {
        let root = scratch("ignore");
        std::fs::create_dir_all(&root).unwrap();
        let root_path = root.to_string_lossy().to_string();

        let mut tolerated = MountList::default();
        tolerated.insert(MountEntry {
            source: "/nonexistent-source".to_string(),
            target: "/a".to_string(),
            flags: MsFlags::MS_BIND,
            ignore_errors: true,
            kind: MountKind::Path,
        });
        assert!(mount_entries(&tolerated, &root_path).is_ok());

        let mut fatal = MountList::default();
        fatal.insert(MountEntry {
            source: "/nonexistent-source".to_string(),
            target: "/b".to_string(),
            flags: MsFlags::MS_BIND,
            ignore_errors: false,
            kind: MountKind::Path,
        });
        assert!(mount_entries(&fatal, &root_path).is_err());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_link_entries_tolerate_existing_links() {
        let root = scratch("links");
        std::fs::create_dir_all(root.join("bin")).unwrap();
        let root_path = root.to_string_lossy().to_string();

        let mut links = LinkList::default();
        links.insert(LinkEntry {
            target: "/system/bin/sh".to_string(),
            link_name: "/bin/sh".to_string(),
        });
        assert!(link_entries(&links, &root_path).is_ok());
        assert!(root.join("bin/sh").is_symlink());

        /* Linking again hits EEXIST, which is only a warning. */
        assert!(link_entries(&links, &root_path).is_ok());

        /* A link whose parent directory is missing is fatal. */
        let mut broken = LinkList::default();
        broken.insert(LinkEntry {
            target: "/system/bin/sh".to_string(),
            link_name: "/no-such-dir/sh".to_string(),
        });
        assert!(link_entries(&broken, &root_path).is_err());

        std::fs::remove_dir_all(&root).unwrap();
    }
}
