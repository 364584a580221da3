use anyhow::{Context, Result, anyhow};
use log::info;
use nix::mount::MsFlags;
use serde_json::Value;
use std::path::Path;

use super::{LinkEntry, MountEntry, MountKind, Sandbox};

const SANDBOX_ROOT_TAG: &str = "sandbox-root";
const MOUNT_PATH_TAG: &str = "mount-bind-paths";
const MOUNT_FILE_TAG: &str = "mount-bind-files";
const SYMLINK_TAG: &str = "symbol-links";
const MOUNT_SOURCE: &str = "src-path";
const MOUNT_TARGET: &str = "sandbox-path";
const MOUNT_FLAGS: &str = "sandbox-flags";
const MOUNT_IGNORE_ERRORS: &str = "ignore";
const SYMLINK_TARGET: &str = "target-name";
const SYMLINK_NAME: &str = "link-name";

/* Fixed table of recognized mount flag strings. Anything else in a
 * sandbox-flags array contributes nothing. */
fn mount_flag(name: &str) -> MsFlags {
    match name {
        "bind" => MsFlags::MS_BIND,
        "private" => MsFlags::MS_PRIVATE,
        "rec" => MsFlags::MS_REC,
        "move" => MsFlags::MS_MOVE,
        _ => MsFlags::empty(),
    }
}

fn string_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

impl Sandbox {
    /* Reads and applies one policy document. An unreadable file is skipped;
     * a document that fails to parse, or a first document without
     * sandbox-root, aborts ingestion for this sandbox. */
    pub fn ingest_config_file(&mut self, path: &Path) -> Result<()> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                info!(
                    "Skipping sandbox config '{}': {}",
                    path.display(),
                    e
                );
                return Ok(());
            }
        };
        let root: Value = serde_json::from_str(&contents).with_context(|| {
            format!("failed to parse sandbox config '{}'", path.display())
        })?;
        self.apply_config(&root).with_context(|| {
            format!("invalid sandbox config '{}'", path.display())
        })?;
        self.config_paths.push(path.to_path_buf());
        Ok(())
    }

    /* The sandbox root is fixed by the first document that provides it;
     * later documents cannot move it. */
    pub fn apply_config(&mut self, root: &Value) -> Result<()> {
        if self.root_path.is_none() {
            let tag = root.get(SANDBOX_ROOT_TAG).ok_or_else(|| {
                anyhow!("cannot find '{}' in sandbox config", SANDBOX_ROOT_TAG)
            })?;
            if let Some(rootdir) = tag.as_str() {
                self.root_path = Some(rootdir.to_string());
            }
        }
        self.collect_mounts(root, MOUNT_PATH_TAG, MountKind::Path);
        self.collect_mounts(root, MOUNT_FILE_TAG, MountKind::File);
        self.collect_links(root);
        Ok(())
    }

    /* A section that is absent, not an array, or empty contributes nothing.
     * Elements missing a mandatory field are skipped one by one. */
    fn collect_mounts(&mut self, root: &Value, section: &str, kind: MountKind) {
        let Some(items) = root.get(section).and_then(Value::as_array) else {
            return;
        };
        for item in items {
            let Some(source) = string_field(item, MOUNT_SOURCE) else {
                info!("Get {} is null", MOUNT_SOURCE);
                continue;
            };
            let Some(target) = string_field(item, MOUNT_TARGET) else {
                info!("Get {} is null", MOUNT_TARGET);
                continue;
            };
            let Some(flag_names) =
                item.get(MOUNT_FLAGS).and_then(Value::as_array)
            else {
                info!("Get {} is null", MOUNT_FLAGS);
                continue;
            };
            if flag_names.is_empty() {
                info!("Get {} array size is zero", MOUNT_FLAGS);
                continue;
            }
            let flags = flag_names
                .iter()
                .filter_map(Value::as_str)
                .map(mount_flag)
                .fold(MsFlags::empty(), |acc, flag| acc | flag);
            let ignore_errors = item
                .get(MOUNT_IGNORE_ERRORS)
                .and_then(Value::as_f64)
                == Some(1.0);

            let entry = MountEntry {
                source: source.to_string(),
                target: target.to_string(),
                flags,
                ignore_errors,
                kind,
            };
            match kind {
                MountKind::Path => self.path_mounts.insert(entry),
                MountKind::File => self.file_mounts.insert(entry),
            }
        }
    }

    fn collect_links(&mut self, root: &Value) {
        let Some(items) = root.get(SYMLINK_TAG).and_then(Value::as_array)
        else {
            return;
        };
        for item in items {
            let Some(target) = string_field(item, SYMLINK_TARGET) else {
                info!("Get {} is null", SYMLINK_TARGET);
                continue;
            };
            let Some(link_name) = string_field(item, SYMLINK_NAME) else {
                info!("Get {} is null", SYMLINK_NAME);
                continue;
            };
            self.links.insert(LinkEntry {
                target: target.to_string(),
                link_name: link_name.to_string(),
            });
        }
    }
}
