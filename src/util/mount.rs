use anyhow::{Context, Result};
use nix::mount::MsFlags;
use std::ffi::OsStr;
use std::path::Path;

/* Every mount this tool issues is a bind or a propagation change, so no
 * filesystem type and no data string ever go to the kernel. */
pub fn mount_raw(
    source: Option<&Path>,
    target: &Path,
    flags: MsFlags,
) -> nix::Result<()> {
    let none: Option<&OsStr> = None;
    nix::mount::mount(source, target, none, flags, none)
}

pub fn mount(
    source: Option<&Path>,
    target: &Path,
    flags: MsFlags,
) -> Result<()> {
    mount_raw(source, target, flags).with_context(|| {
        format!(
            "failed to mount {} onto {} [flags={:#x}]",
            source.unwrap_or(Path::new("none")).display(),
            target.display(),
            flags.bits()
        )
    })
}
