//! Error taxonomy for manifest handling and dependency reconciliation.
//!
//! Every failure mode a caller can act on has its own variant. Reconciliation
//! errors name the dependency they belong to so that a batch run can attribute
//! each failure; the `detail` fields carry the diagnostic text captured from
//! the underlying git backend.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A manifest entry is missing required fields for its kind, or is
    /// otherwise unusable (e.g. no repository configured and no working copy
    /// present to fall back on).
    #[error("invalid descriptor for {name}: {message}")]
    InvalidDescriptor { name: String, message: String },

    /// The manifest file could not be read or parsed, including entries of an
    /// unrecognized dependency kind. Fatal to the whole run.
    #[error("failed to parse manifest {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// The output manifest could not be serialized or written.
    #[error("failed to write manifest {path}: {message}")]
    ManifestWrite { path: String, message: String },

    /// The path does not exist or is not a valid working copy.
    #[error("no working copy at {path}")]
    NoWorkingCopy { path: String },

    /// The working copy exists but its current revision could not be read.
    #[error("could not resolve revision of {path}: {detail}")]
    ResolutionFailed { path: String, detail: String },

    /// Cloning the dependency's repository failed.
    #[error("clone of {url} into {name} failed: {detail}")]
    CloneFailed {
        name: String,
        url: String,
        detail: String,
    },

    /// The requested branch exists neither locally nor on the remote.
    #[error("could not switch {name} to branch {branch}: {detail}")]
    BranchSwitchFailed {
        name: String,
        branch: String,
        detail: String,
    },

    /// Fetching from the remote or fast-forwarding the local branch failed.
    /// A diverged local branch lands here; it is surfaced, never auto-merged.
    #[error("could not synchronize {name} from {url}: {detail}")]
    SyncFailed {
        name: String,
        url: String,
        detail: String,
    },

    /// The target revision does not exist even after synchronization.
    #[error("checkout of {target} in {name} failed: {detail}")]
    CheckoutFailed {
        name: String,
        target: String,
        detail: String,
    },

    /// Strict lookup of a name absent from the manifest.
    #[error("unknown dependency: {name}")]
    UnknownDependency { name: String },
}
