use anyhow::{Context, Result};
use log::{error, info};
use std::path::Path;

use super::{Role, Sandbox};
use crate::config::config_layers;
use crate::ns;

/* One Sandbox record per role for the lifetime of the process. */
pub struct SandboxRegistry {
    sandboxes: [Sandbox; Role::ALL.len()],
}

impl SandboxRegistry {
    pub fn new() -> SandboxRegistry {
        SandboxRegistry {
            sandboxes: [
                Sandbox::new(Role::System),
                Sandbox::new(Role::Chipset),
                Sandbox::new(Role::PrivApp),
                Sandbox::new(Role::App),
            ],
        }
    }

    pub fn get(&self, role: Role) -> &Sandbox {
        &self.sandboxes[role as usize]
    }

    fn get_mut(&mut self, role: Role) -> &mut Sandbox {
        &mut self.sandboxes[role as usize]
    }

    /* Creates the role's mount namespace, captures its handle, then ingests
     * every discovered policy document in layer order. The handle must be
     * captured after the unshare and before anything populates the new
     * namespace; a handle captured earlier would silently denote the
     * pre-sandbox namespace. */
    pub fn init_sandbox(
        &mut self,
        role: Role,
        override_file: Option<&Path>,
    ) -> Result<()> {
        if self.get(role).is_created {
            info!("Sandbox '{}' has already been created", role);
            return Ok(());
        }

        ns::unshare_mount_namespace().with_context(|| {
            format!("failed to unshare a namespace for sandbox '{}'", role)
        })?;
        let handle = ns::open_mount_namespace(ns::SELF_MOUNT_NAMESPACE)
            .with_context(|| {
                format!("failed to capture the namespace of sandbox '{}'", role)
            })?;
        self.get_mut(role).namespace = Some(handle);

        let files = match override_file {
            Some(file) => vec![file.to_path_buf()],
            None => config_layers(role.config_name()),
        };
        for file in &files {
            info!("Parsing sandbox config file {}", file.display());
            if let Err(e) = self.get_mut(role).ingest_config_file(file) {
                error!(
                    "Failed to ingest sandbox config {}: {:#}",
                    file.display(),
                    e
                );
                self.destroy_sandbox(role);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn prepare_sandbox(&mut self, role: Role) -> Result<()> {
        self.get_mut(role).prepare()
    }

    pub fn enter_sandbox(&self, role: Role) -> Result<()> {
        self.get(role).enter()
    }

    pub fn destroy_sandbox(&mut self, role: Role) {
        self.get_mut(role).destroy();
    }

    pub fn dump_sandbox(&self, role: Role) {
        self.get(role).dump();
    }
}

impl Default for SandboxRegistry {
    fn default() -> Self {
        Self::new()
    }
}
