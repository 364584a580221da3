use nix::mount::MsFlags;
use std::os::fd::OwnedFd;
use std::path::PathBuf;

use super::Role;

/* Whether a bind target must be prepared as a directory or as a regular
 * file before the mount is attempted. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Path,
    File,
}

#[derive(Debug, Clone)]
pub struct MountEntry {
    pub source: String,
    pub target: String,
    pub flags: MsFlags,
    pub ignore_errors: bool,
    pub kind: MountKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub target: String,
    pub link_name: String,
}

/* Insertion-ordered mount collection keyed by target path. Inserting an
 * entry whose target is already present drops the superseded entry and
 * appends the new one at the tail; insertion order is otherwise kept. */
#[derive(Debug, Default)]
pub struct MountList {
    entries: Vec<MountEntry>,
}

impl MountList {
    pub fn insert(&mut self, entry: MountEntry) {
        self.entries.retain(|e| e.target != entry.target);
        self.entries.push(entry);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/* Same shape as MountList, keyed by the symlink's own path. */
#[derive(Debug, Default)]
pub struct LinkList {
    entries: Vec<LinkEntry>,
}

impl LinkList {
    pub fn insert(&mut self, entry: LinkEntry) {
        self.entries.retain(|e| e.link_name != entry.link_name);
        self.entries.push(entry);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LinkEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub struct Sandbox {
    pub role: Role,
    /* Write-once: the first policy document that provides sandbox-root
     * fixes it for the lifetime of the record. */
    pub root_path: Option<String>,
    pub config_paths: Vec<PathBuf>,
    pub path_mounts: MountList,
    pub file_mounts: MountList,
    pub links: LinkList,
    pub namespace: Option<OwnedFd>,
    pub is_created: bool,
}

impl Sandbox {
    pub fn new(role: Role) -> Sandbox {
        Sandbox {
            role,
            root_path: None,
            config_paths: Vec::new(),
            path_mounts: MountList::default(),
            file_mounts: MountList::default(),
            links: LinkList::default(),
            namespace: None,
            is_created: false,
        }
    }

    /* Releases every parsed entry and the namespace handle. Bookkeeping
     * only: mounts already applied to the kernel stay with the namespace
     * until the process exits. */
    pub fn destroy(&mut self) {
        self.root_path = None;
        self.config_paths.clear();
        self.path_mounts.clear();
        self.file_mounts.clear();
        self.links.clear();
        self.namespace = None;
        self.is_created = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount_entry(source: &str, target: &str) -> MountEntry {
        MountEntry {
            source: source.to_string(),
            target: target.to_string(),
            flags: MsFlags::MS_BIND,
            ignore_errors: false,
            kind: MountKind::Path,
        }
    }

    #[test]
    fn test_mount_list_overrides_by_target() {
        let mut mounts = MountList::default();
        mounts.insert(mount_entry("/system", "/system"));
        mounts.insert(mount_entry("/vendor", "/vendor"));
        mounts.insert(mount_entry("/patched-system", "/system"));

        /* The superseded entry is gone and the replacement sits at the
         * tail. */
        assert_eq!(mounts.len(), 2);
        let targets: Vec<&str> =
            mounts.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["/vendor", "/system"]);
        let last = mounts.iter().next_back().unwrap();
        assert_eq!(last.source, "/patched-system");
    }

    #[test]
    fn test_link_list_overrides_by_link_name() {
        let mut links = LinkList::default();
        links.insert(LinkEntry {
            target: "/system/bin/sh".to_string(),
            link_name: "/bin/sh".to_string(),
        });
        links.insert(LinkEntry {
            target: "/vendor/bin/sh".to_string(),
            link_name: "/bin/sh".to_string(),
        });

        assert_eq!(links.len(), 1);
        assert_eq!(links.iter().next().unwrap().target, "/vendor/bin/sh");
    }

    #[test]
    fn test_destroy_resets_everything() {
        let mut sandbox = Sandbox::new(Role::System);
        sandbox.root_path = Some("/mnt/sandbox/system".to_string());
        sandbox.config_paths.push("/tmp/sandbox.json".into());
        sandbox.path_mounts.insert(mount_entry("/system", "/system"));
        sandbox.links.insert(LinkEntry {
            target: "/system/bin/sh".to_string(),
            link_name: "/bin/sh".to_string(),
        });
        sandbox.is_created = true;

        sandbox.destroy();

        assert!(sandbox.root_path.is_none());
        assert!(sandbox.config_paths.is_empty());
        assert!(sandbox.path_mounts.is_empty());
        assert!(sandbox.file_mounts.is_empty());
        assert!(sandbox.links.is_empty());
        assert!(sandbox.namespace.is_none());
        assert!(!sandbox.is_created);
    }
}
