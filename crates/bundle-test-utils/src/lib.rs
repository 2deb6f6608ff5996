//! Shared test utilities for the clone-bundler workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures built through `git2`
//! - [`product`]: product repositories carrying `VERSION` and `CHANGES`
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace) holding origins and bundles

pub mod git;
pub mod product;
pub mod workspace;
