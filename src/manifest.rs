//! Version information file ("vif") loading, lookup and serialization.
//!
//! The manifest is a YAML mapping from dependency name to an entry describing
//! where the dependency comes from and which state is wanted:
//!
//! ```yaml
//! libfoo:
//!   type: git
//!   repository: git@example.com:libfoo
//!   branch: master
//!   version: 395c7383deadbeef
//! ```
//!
//! `version` on input is a pin (the exact revision to check out); on output it
//! always carries the revision actually observed in the working copy after
//! reconciliation. Entry kinds are an open set keyed by `type`; only `git` is
//! implemented today, and an unknown kind is a parse error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Sentinel returned by [`Manifest::lookup_resolved_version`] when a
/// dependency is absent or was never resolved.
pub const UNKNOWN_VERSION: &str = "unknown";

fn default_branch() -> String {
    "master".to_string()
}

/// Kind-specific part of a dependency entry, selected by the `type` tag.
///
/// Adding a new dependency kind means adding a variant here; existing
/// variants stay untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependencySource {
    /// A dependency backed by a git repository.
    Git {
        /// Remote address of the authoritative copy. May be absent for a
        /// working copy that is materialized and updated out of band; such a
        /// dependency is only ever inspected, never synchronized.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repository: Option<String>,
        /// Named line of development to track.
        #[serde(default = "default_branch")]
        branch: String,
    },
}

/// On-disk shape of one manifest entry.
#[derive(Debug, Serialize, Deserialize)]
struct RawEntry {
    #[serde(flatten)]
    source: DependencySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// One parsed, validated manifest entry.
///
/// `name` doubles as the working-copy directory name. `resolved_version` is
/// only ever written by reconciliation or inspection; it reflects the working
/// copy at the moment it was read and is not a cache across out-of-band
/// changes to the directory.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    /// Exact revision pin from the manifest, if any. When set, reconciliation
    /// must land on this revision rather than the branch tip.
    pub requested_version: Option<String>,
    /// Revision observed in the working copy after the most recent
    /// reconciliation or inspection.
    pub resolved_version: Option<String>,
    pub source: DependencySource,
}

impl Dependency {
    /// Remote address, if one is configured.
    pub fn repository(&self) -> Option<&str> {
        match &self.source {
            DependencySource::Git { repository, .. } => repository.as_deref(),
        }
    }

    /// Branch tracked by this dependency.
    pub fn branch(&self) -> &str {
        match &self.source {
            DependencySource::Git { branch, .. } => branch,
        }
    }
}

/// The full manifest: dependency name → entry, names unique.
#[derive(Debug, Default)]
pub struct Manifest {
    pub deps: BTreeMap<String, Dependency>,
}

impl Manifest {
    /// Load and parse a manifest file.
    ///
    /// # Errors
    /// - [`Error::ManifestParse`] if the file cannot be read, is not valid
    ///   YAML/JSON, contains duplicate names, or declares an unknown kind.
    /// - [`Error::InvalidDescriptor`] if an entry has an empty name.
    pub fn load(path: &Path) -> Result<Manifest> {
        let text = fs::read_to_string(path).map_err(|e| Error::ManifestParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse manifest text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Manifest> {
        let raw: BTreeMap<String, RawEntry> =
            serde_yaml::from_str(text).map_err(|e| Error::ManifestParse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;

        let mut deps = BTreeMap::new();
        for (name, entry) in raw {
            if name.trim().is_empty() {
                return Err(Error::InvalidDescriptor {
                    name,
                    message: "dependency name must not be empty".to_string(),
                });
            }
            deps.insert(
                name.clone(),
                Dependency {
                    name,
                    requested_version: entry.version,
                    resolved_version: None,
                    source: entry.source,
                },
            );
        }
        Ok(Manifest { deps })
    }

    /// Serialize the current state back to YAML text.
    ///
    /// Each entry carries its kind tag, repository (when known), branch, and
    /// `version` — the resolved revision when one has been observed, falling
    /// back to the requested pin. Loading the result again therefore
    /// reproduces the same target state.
    pub fn to_yaml(&self) -> Result<String> {
        let raw: BTreeMap<&str, RawEntry> = self
            .deps
            .values()
            .map(|d| {
                let version = d
                    .resolved_version
                    .clone()
                    .or_else(|| d.requested_version.clone());
                (
                    d.name.as_str(),
                    RawEntry {
                        source: d.source.clone(),
                        version,
                    },
                )
            })
            .collect();
        serde_yaml::to_string(&raw).map_err(|e| Error::ManifestWrite {
            path: "<in-memory>".to_string(),
            message: e.to_string(),
        })
    }

    /// Write the current state to an output manifest file.
    ///
    /// # Errors
    /// [`Error::ManifestWrite`] if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_yaml().map_err(|e| match e {
            Error::ManifestWrite { message, .. } => Error::ManifestWrite {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        fs::write(path, text).map_err(|e| Error::ManifestWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Strict lookup of a dependency's resolved revision.
    ///
    /// # Errors
    /// [`Error::UnknownDependency`] if `name` is not in the manifest. A known
    /// but never-resolved dependency yields `Ok(None)`.
    pub fn resolved_version(&self, name: &str) -> Result<Option<&str>> {
        let dep = self
            .deps
            .get(name)
            .ok_or_else(|| Error::UnknownDependency {
                name: name.to_string(),
            })?;
        Ok(dep.resolved_version.as_deref())
    }

    /// Best-effort lookup for display: the resolved revision of `name`, or
    /// [`UNKNOWN_VERSION`] if the dependency is absent or never resolved.
    pub fn lookup_resolved_version(&self, name: &str) -> &str {
        match self.resolved_version(name) {
            Ok(Some(rev)) => rev,
            _ => UNKNOWN_VERSION,
        }
    }
}
