use log::trace;
use std::env;
use std::path::PathBuf;

/* Configuration layers in discovery order: the system image provides the
 * base policy, chipset/product layers overlay it. */
const DEFAULT_POLICY_DIRS: [&str; 4] =
    ["/system", "/chipset", "/sys_prod", "/chip_prod"];

const POLICY_DIRS_ENV: &str = "SANDBOX_POLICY_DIRS";

pub fn policy_dirs() -> Vec<PathBuf> {
    match env::var(POLICY_DIRS_ENV) {
        Ok(dirs) if !dirs.is_empty() => {
            dirs.split(':').map(PathBuf::from).collect()
        }
        _ => DEFAULT_POLICY_DIRS.iter().map(PathBuf::from).collect(),
    }
}

/* Resolves a relative policy path against every layer, returning the files
 * that actually exist, in discovery order. */
pub fn config_layers(relative: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in policy_dirs() {
        let candidate = dir.join(relative);
        if candidate.is_file() {
            trace!("Found sandbox config layer {}", candidate.display());
            files.push(candidate);
        }
    }
    files
}
