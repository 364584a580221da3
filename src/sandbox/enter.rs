use anyhow::{Context, Result, anyhow};
use std::os::fd::AsFd;

use super::Sandbox;
use crate::ns;

impl Sandbox {
    /* Joins the calling thread to this sandbox's captured mount namespace.
     * This is how a process that never ran prepare() ends up inside the
     * constructed view, provided it was handed this record's handle. */
    pub fn enter(&self) -> Result<()> {
        if !self.is_created {
            return Err(anyhow!(
                "sandbox '{}' has not been created",
                self.role
            ));
        }
        match self.namespace.as_ref() {
            Some(handle) => {
                ns::join_mount_namespace(handle.as_fd()).with_context(|| {
                    format!(
                        "cannot enter mount namespace for sandbox '{}'",
                        self.role
                    )
                })
            }
            None => Err(anyhow!(
                "sandbox '{}' namespace handle is invalid",
                self.role
            )),
        }
    }
}
