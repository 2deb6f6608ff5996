//! Command implementations for bundle-cli

pub mod archive;
pub mod changelog;
pub mod clones;
pub mod release;

pub use archive::run_archive;
pub use changelog::run_bundle_changelog;
pub use clones::{run_clones_list, run_clones_out, run_make_clones, run_refresh_urls, run_update_clones};
pub use release::{run_release_bundle, run_release_clone, run_release_multiple};
