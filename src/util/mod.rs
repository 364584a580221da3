mod mkdir;
mod mount;

pub use mkdir::*;
pub use mount::*;
