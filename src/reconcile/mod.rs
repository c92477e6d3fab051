//! Drive working copies to the state the manifest demands.
//!
//! Per dependency the steps are, in order: ensure a working copy is present
//! (clone), switch it to the requested branch, fast-forward that branch from
//! the remote, check out the target (pinned revision or branch tip), and
//! finally read back the revision actually on disk. Each step is idempotent,
//! so a run interrupted at any point can simply be repeated; none of them
//! discards local modifications.
//!
//! [`reconcile_all`] runs the whole manifest in parallel with a progress
//! spinner per dependency; one failing dependency never blocks the others.

mod progress;

use indicatif::{MultiProgress, ProgressBar};
use log::debug;
use rayon::prelude::*;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::git::Vcs;
use crate::manifest::{Dependency, Manifest};
use crate::revision;

use progress::{err_style, ok_style, spinner_style};

/// Result of reconciling or inspecting one dependency: the resolved revision
/// on success, the attributed error otherwise.
pub struct Outcome {
    pub name: String,
    pub result: Result<String>,
}

/// Bring one dependency's working copy to the state its descriptor demands
/// and return the revision observed afterwards.
///
/// The working copy lives at `<root>/<name>`. A dependency without a
/// configured repository is valid only if its working copy already exists;
/// it is then resolved in place and never synchronized.
///
/// # Errors
/// One of [`Error::InvalidDescriptor`], [`Error::CloneFailed`],
/// [`Error::BranchSwitchFailed`], [`Error::SyncFailed`],
/// [`Error::CheckoutFailed`], [`Error::NoWorkingCopy`] or
/// [`Error::ResolutionFailed`], attributed to this dependency; the first
/// failing step aborts the rest.
pub fn reconcile(dep: &mut Dependency, root: &Path, vcs: &dyn Vcs) -> Result<String> {
    let workdir = root.join(&dep.name);
    let present = workdir.join(".git").exists();

    match dep.repository() {
        None if !present => {
            return Err(Error::InvalidDescriptor {
                name: dep.name.clone(),
                message: "no repository configured and no working copy present".to_string(),
            });
        }
        None => {
            debug!("{}: no repository configured, resolving in place", dep.name);
        }
        Some(url) => {
            let url = url.to_string();
            let branch = dep.branch().to_string();

            if !present {
                debug!("{}: cloning {url}", dep.name);
                vcs.clone_repo(&url, &workdir)
                    .map_err(|e| Error::CloneFailed {
                        name: dep.name.clone(),
                        url: url.clone(),
                        detail: format!("{e:#}"),
                    })?;
            }

            // Unconditional: a fresh clone may default to another branch.
            debug!("{}: switching to branch {branch}", dep.name);
            vcs.checkout_branch(&workdir, &branch)
                .map_err(|e| Error::BranchSwitchFailed {
                    name: dep.name.clone(),
                    branch: branch.clone(),
                    detail: format!("{e:#}"),
                })?;

            // Never skipped, even when pinned: the pin may only exist
            // locally after this fetch.
            debug!("{}: synchronizing from {url}", dep.name);
            vcs.fetch_and_merge(&workdir, &url, &branch)
                .map_err(|e| Error::SyncFailed {
                    name: dep.name.clone(),
                    url: url.clone(),
                    detail: format!("{e:#}"),
                })?;

            let target = dep.requested_version.as_deref().unwrap_or(&branch);
            debug!("{}: checking out {target}", dep.name);
            vcs.checkout_revision(&workdir, target)
                .map_err(|e| Error::CheckoutFailed {
                    name: dep.name.clone(),
                    target: target.to_string(),
                    detail: format!("{e:#}"),
                })?;
        }
    }

    // Success is defined by observing a revision, not by the steps above.
    let resolved = revision::resolve(&workdir, vcs)?;
    dep.resolved_version = Some(resolved.clone());
    Ok(resolved)
}

/// Reconcile every dependency of the manifest, in parallel.
///
/// Working-copy directories are disjoint, so dependencies are independent;
/// the steps within one dependency stay strictly sequential. Every
/// dependency is attempted regardless of other failures, and the returned
/// outcomes make partial failure visible per name. With `quiet` no progress
/// spinners are drawn.
pub fn reconcile_all(
    manifest: &mut Manifest,
    root: &Path,
    vcs: &dyn Vcs,
    quiet: bool,
) -> Vec<Outcome> {
    let entries: Vec<(&String, &mut Dependency)> = manifest.deps.iter_mut().collect();

    let mp = MultiProgress::new();
    let bars: Option<Vec<ProgressBar>> = (!quiet).then(|| {
        entries
            .iter()
            .map(|(name, _)| {
                let pb = mp.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style());
                pb.set_message(format!("reconciling {name}"));
                pb.enable_steady_tick(Duration::from_millis(80));
                pb
            })
            .collect()
    });

    entries
        .into_par_iter()
        .enumerate()
        .map(|(idx, (name, dep))| {
            let result = reconcile(dep, root, vcs);
            if let Some(bars) = &bars {
                let pb = &bars[idx];
                match &result {
                    Ok(rev) => {
                        pb.set_style(ok_style());
                        pb.finish_with_message(format!("{name} at {rev}"));
                    }
                    Err(e) => {
                        pb.set_style(err_style());
                        pb.finish_with_message(format!("{name}: {e}"));
                    }
                }
            }
            Outcome {
                name: name.to_string(),
                result,
            }
        })
        .collect()
}

/// Re-inspect every dependency's working copy without mutating anything.
///
/// Used for `--no-update` runs: resolved revisions are refreshed from disk,
/// absent or unreadable working copies are reported as that dependency's
/// failure, and no remote is contacted.
pub fn inspect_all(manifest: &mut Manifest, root: &Path, vcs: &dyn Vcs) -> Vec<Outcome> {
    manifest
        .deps
        .iter_mut()
        .map(|(name, dep)| {
            let result = revision::resolve(&root.join(name), vcs);
            if let Ok(rev) = &result {
                dep.resolved_version = Some(rev.clone());
            }
            Outcome {
                name: name.clone(),
                result,
            }
        })
        .collect()
}
