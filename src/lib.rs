//! Crate entry point for **vif**.
//!
//! This library implements the `vif` CLI: it loads a version information
//! file (a YAML manifest of git-backed dependencies), drives each
//! dependency's working copy to the requested branch or pinned revision,
//! and records the revision actually present afterwards.
//!
//! Each submodule encapsulates one responsibility: manifest parsing and
//! serialization (`manifest`), the error taxonomy (`error`), the
//! version-control backend seam (`git`), working-copy revision inspection
//! (`revision`), and the reconciliation engine (`reconcile`). The `pub use`
//! re-exports make the public surface reachable from `vif::*`.

mod error;
mod git;
mod manifest;
mod reconcile;
mod revision;

pub use error::{Error, Result};
pub use git::{Git2Backend, Vcs};
pub use manifest::{Dependency, DependencySource, Manifest, UNKNOWN_VERSION};
pub use reconcile::{Outcome, inspect_all, reconcile, reconcile_all};
pub use revision::resolve;
