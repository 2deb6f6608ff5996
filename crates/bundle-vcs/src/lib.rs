//! Version-control backend for Clone Bundler
//!
//! The bundler never touches repository storage itself. It talks to working
//! copies through the [`Vcs`] trait and obtains them from a [`VcsProvider`].
//! [`GitProvider`] implements both on top of libgit2.

pub mod backend;
pub mod error;
pub mod git;
mod helpers;
pub mod naming;

pub use backend::{Revision, Vcs, VcsProvider, WorkingState};
pub use error::{Error, Result};
pub use git::{GitBackend, GitProvider, Identity};
pub use naming::ref_component;
