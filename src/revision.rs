//! Read the concrete revision of an on-disk working copy.

use log::debug;
use std::path::Path;

use crate::error::{Error, Result};
use crate::git::Vcs;

/// Resolve the current revision of the working copy at `workdir`.
///
/// Inspects only the local directory, never the remote, and performs no
/// mutation; repeated calls without intervening changes return the same
/// value.
///
/// # Errors
/// - [`Error::NoWorkingCopy`] if `workdir` does not exist or is not a
///   working copy.
/// - [`Error::ResolutionFailed`] if the working copy exists but its head
///   cannot be read (corruption, backend error).
pub fn resolve(workdir: &Path, vcs: &dyn Vcs) -> Result<String> {
    if !workdir.join(".git").exists() {
        return Err(Error::NoWorkingCopy {
            path: workdir.display().to_string(),
        });
    }
    let rev = vcs
        .current_revision(workdir)
        .map_err(|e| Error::ResolutionFailed {
            path: workdir.display().to_string(),
            detail: format!("{e:#}"),
        })?;
    debug!("{} is at {rev}", workdir.display());
    Ok(rev)
}
