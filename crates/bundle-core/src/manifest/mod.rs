//! Manifest documents
//!
//! A manifest is parsed once into an owned [`ManifestDoc`] tree. Resolution
//! never mutates a loaded tree in place, it builds expanded copies.

mod model;
mod parse;
mod write;

pub use model::{Attributes, Element, ManifestDoc, Node};

/// Element and attribute names of the manifest vocabulary.
pub mod names {
    pub const SERVER: &str = "server";
    pub const INCLUDE_BUNDLES: &str = "include-bundles";
    pub const INCLUDED_MARKER: &str = "already-included-bundles";
    pub const EXCLUDE: &str = "exclude";
    pub const TAG: &str = "tag";
    pub const BRANCH: &str = "branch";

    pub const NAME: &str = "name";
    pub const URL: &str = "url";
    pub const SERVER_URL: &str = "server-url";
    pub const PUSH_URL: &str = "push-url";
    pub const PATH: &str = "path";
    pub const TARGET: &str = "target";
    pub const SUBPATH: &str = "subpath";
    pub const FROM_INCLUDE: &str = "from-include";
}
