//! Version-control integration layer.
//!
//! The reconciler never talks to a repository directly; it goes through the
//! [`Vcs`] trait, whose operations map one-to-one onto the steps of the
//! reconciliation algorithm. The production implementation
//! ([`Git2Backend`]) is bound to libgit2 via the `git2` crate, but nothing
//! outside this module depends on that choice, and tests substitute a
//! recording mock.
//!
//! Every operation takes the working directory explicitly; none of them read
//! or change the process's current directory. Operation errors carry the
//! backend's diagnostic text for attribution to a dependency by the caller.

mod git2_backend;

pub use git2_backend::Git2Backend;

use anyhow::Result;
use std::path::Path;

/// Operations the reconciler needs from a version-control backend.
///
/// `Sync` is required so independent dependencies can be reconciled in
/// parallel; implementations must not keep per-call mutable state.
pub trait Vcs: Sync {
    /// Clone `source` into `dest`. Mutates: creates `dest`.
    fn clone_repo(&self, source: &str, dest: &Path) -> Result<()>;

    /// Switch the working copy onto `branch`, creating a local tracking
    /// branch from `origin/<branch>` if necessary. No-op when already on the
    /// branch. Mutates: HEAD and the worktree.
    fn checkout_branch(&self, workdir: &Path, branch: &str) -> Result<()>;

    /// Fetch from `source` and fast-forward the local `branch` to
    /// `origin/<branch>`. Fails if the local branch has diverged; never
    /// creates a merge commit. Mutates: remote refs, the local branch ref,
    /// and the worktree.
    fn fetch_and_merge(&self, workdir: &Path, source: &str, branch: &str) -> Result<()>;

    /// Check out a revision: a branch name attaches HEAD to the branch, a
    /// tag or commit id detaches HEAD at the commit. Mutates: HEAD and the
    /// worktree.
    fn checkout_revision(&self, workdir: &Path, rev: &str) -> Result<()>;

    /// Revision currently checked out (HEAD's commit id). Read-only.
    fn current_revision(&self, workdir: &Path) -> Result<String>;

    /// Branch HEAD is attached to; fails when HEAD is detached. Read-only.
    fn current_branch(&self, workdir: &Path) -> Result<String>;
}
