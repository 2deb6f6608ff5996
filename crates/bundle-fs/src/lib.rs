//! Filesystem layer for Clone Bundler
//!
//! Conventional bundle paths, atomic writes, relative links and tree copies.

pub mod constants;
pub mod error;
pub mod io;
pub mod link;

pub use constants::BundlePath;
pub use error::{Error, Result};
pub use io::{canonical, copy_tree, read_text, remove_tree, write_atomic, write_text};
pub use link::{link_dir, relative_prefix};
