//! Manifest resolution and release coordination for Clone Bundler
//!
//! A bundle is a directory with a `BUNDLE_MANIFEST.xml` declaring the
//! repositories it is made of. This crate resolves such manifests into
//! [`RepoDescriptor`]s, releases the repositories with automatic version
//! computation, and records bundle releases in the bundle's own working copy.
//!
//! # Layout
//!
//! - [`manifest`]: the manifest document model, parsing and writing
//! - [`resolver`]: include expansion and descriptor merging
//! - [`releaser`], [`preflight`], [`version`]: releases of one repository
//! - [`coordinator`]: single and multiple bundle releases
//! - [`config`]: layered configuration

pub mod archive;
pub mod bundle;
pub mod changelog;
pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod preflight;
pub mod releaser;
pub mod resolver;
pub mod server;
pub mod version;

pub use bundle::{Bundle, Outgoing};
pub use changelog::{BundleChangelog, ChangedProduct};
pub use config::{BundlerConfig, ConfigResolver, ReleaseSettings, TagNaming};
pub use coordinator::{ReleaseMode, Released, release_multiple};
pub use descriptor::{RepoDescriptor, RepoKind, SubRepo};
pub use error::{Error, ReleaseFailure, Result};
pub use manifest::ManifestDoc;
pub use releaser::{Bump, Decision, Lineage, ReleaseOptions, decide};
pub use resolver::{ResolvedBundle, resolve};
pub use server::Server;
pub use version::{ChangeCategories, MarkerFormat, VersionMarker, VersionState};
