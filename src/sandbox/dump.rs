#![allow(clippy::print_stdout)]

use super::Sandbox;

impl Sandbox {
    /* Read-only diagnostic listing of everything parsed so far. Safe on a
     * sandbox that was never initialized. */
    pub fn dump(&self) {
        println!("Sandbox name: {}", self.role);
        println!("Sandbox config file: {}", self.role.config_name());
        for path in &self.config_paths {
            println!("Sandbox parsed config: {}", path.display());
        }
        match &self.root_path {
            Some(root) => println!("Sandbox root path: {}", root),
            None => println!("Sandbox root path is not set"),
        }
        println!("Sandbox mounts info:");
        for entry in self.path_mounts.iter().chain(self.file_mounts.iter()) {
            println!("Sandbox mounts list source: {}", entry.source);
            println!("Sandbox mounts list target: {}", entry.target);
        }
        println!("Sandbox links info:");
        for entry in self.links.iter() {
            println!("Sandbox link list name: {}", entry.link_name);
            println!("Sandbox link list target: {}", entry.target);
        }
    }
}
