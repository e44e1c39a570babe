//! Directory walker (spec §4.2): reconstructs the directory tree from the
//! sorted record stream and drives per-directory and global operations at
//! directory boundaries.

mod frame;
mod walker;

pub use walker::Walker;
