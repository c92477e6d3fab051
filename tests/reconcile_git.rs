//! End-to-end reconciliation tests against real on-disk git repositories.
//!
//! Each test builds its own origin repository in a temporary directory with
//! libgit2, then drives the production [`Git2Backend`] through the
//! reconciler. No network access is involved: clones and fetches go through
//! local paths.

use git2::{Commit, Oid, Repository, RepositoryInitOptions, ResetType, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use vif::{
    Dependency, DependencySource, Error, Git2Backend, Manifest, Vcs, reconcile, reconcile_all,
    resolve,
};

fn init_repo(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("master");
    Repository::init_opts(path, &opts).unwrap()
}

fn commit_file(repo: &Repository, file: &str, contents: &str, msg: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(file), contents).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(file)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("vif test", "vif@example.invalid").unwrap();
    let parents: Vec<Commit> = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, msg, &tree, &parent_refs)
        .unwrap()
}

fn git_dep(name: &str, repository: &Path, branch: &str, pin: Option<&str>) -> Dependency {
    Dependency {
        name: name.to_string(),
        requested_version: pin.map(str::to_string),
        resolved_version: None,
        source: DependencySource::Git {
            repository: Some(repository.display().to_string()),
            branch: branch.to_string(),
        },
    }
}

#[test]
fn clone_lands_on_branch_tip() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    commit_file(&origin, "a.txt", "one", "first");
    let tip = commit_file(&origin, "a.txt", "two", "second");

    let mut dep = git_dep("lib", origin_dir.path(), "master", None);
    let rev = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();

    assert_eq!(rev, tip.to_string());
    assert_eq!(dep.resolved_version.as_deref(), Some(rev.as_str()));
    assert!(workroot.path().join("lib").join(".git").exists());
}

#[test]
fn pinned_revision_wins_over_branch_tip() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    let pinned = commit_file(&origin, "a.txt", "one", "first");
    let tip = commit_file(&origin, "a.txt", "two", "second");
    assert_ne!(pinned, tip);

    let pin = pinned.to_string();
    let mut dep = git_dep("lib", origin_dir.path(), "master", Some(&pin));
    let rev = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();

    assert_eq!(rev, pin);
    // the working copy is detached at the pin, not on the branch
    assert!(Git2Backend.current_branch(&workroot.path().join("lib")).is_err());
}

#[test]
fn reconcile_twice_yields_same_revision() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    commit_file(&origin, "a.txt", "one", "first");

    let mut dep = git_dep("lib", origin_dir.path(), "master", None);
    let first = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();
    let second = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();
    assert_eq!(first, second);
}

#[test]
fn rewound_working_copy_is_fast_forwarded_back_to_tip() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    let first = commit_file(&origin, "a.txt", "one", "first");
    let tip = commit_file(&origin, "a.txt", "two", "second");

    let mut dep = git_dep("lib", origin_dir.path(), "master", None);
    reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();

    // rewind the working copy one commit, as an out-of-band change would
    let workdir = workroot.path().join("lib");
    let copy = Repository::open(&workdir).unwrap();
    let obj = copy.find_object(first, None).unwrap();
    copy.reset(&obj, ResetType::Hard, None).unwrap();
    assert_eq!(resolve(&workdir, &Git2Backend).unwrap(), first.to_string());

    // re-reconciling fast-forwards back to the tip rather than re-reading
    let rev = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();
    assert_eq!(rev, tip.to_string());
}

#[test]
fn branch_switch_lands_on_new_branch_tip() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    let master_tip = commit_file(&origin, "a.txt", "one", "first");

    // grow a dev branch one commit past master, leave origin HEAD on master
    let base = origin.find_commit(master_tip).unwrap();
    origin.branch("dev", &base, false).unwrap();
    origin.set_head("refs/heads/dev").unwrap();
    let dev_tip = commit_file(&origin, "b.txt", "dev", "dev work");
    origin.set_head("refs/heads/master").unwrap();

    let mut dep = git_dep("lib", origin_dir.path(), "master", None);
    let rev = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();
    assert_eq!(rev, master_tip.to_string());

    let mut dep = git_dep("lib", origin_dir.path(), "dev", None);
    let rev = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();
    assert_eq!(rev, dev_tip.to_string());

    let workdir = workroot.path().join("lib");
    assert_eq!(Git2Backend.current_branch(&workdir).unwrap(), "dev");
}

#[test]
fn diverged_local_branch_is_a_sync_failure() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    commit_file(&origin, "a.txt", "one", "first");

    let mut dep = git_dep("lib", origin_dir.path(), "master", None);
    reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();

    // histories diverge: one new commit in the working copy, another upstream
    let copy = Repository::open(workroot.path().join("lib")).unwrap();
    commit_file(&copy, "local.txt", "local", "local work");
    commit_file(&origin, "a.txt", "two", "upstream work");

    let err = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap_err();
    // fast-forward only: divergence is surfaced, never merged over
    assert!(matches!(err, Error::SyncFailed { .. }), "{err}");
}

#[test]
fn pin_absent_after_fetch_is_a_checkout_failure() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    commit_file(&origin, "a.txt", "one", "first");

    let bogus = "0123456789abcdef0123456789abcdef01234567";
    let mut dep = git_dep("lib", origin_dir.path(), "master", Some(bogus));
    let err = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap_err();
    assert!(
        matches!(err, Error::CheckoutFailed { ref target, .. } if target == bogus),
        "{err}"
    );
    assert!(dep.resolved_version.is_none());
}

#[test]
fn missing_branch_is_a_branch_switch_failure() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    commit_file(&origin, "a.txt", "one", "first");

    let mut dep = git_dep("lib", origin_dir.path(), "no-such-branch", None);
    let err = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap_err();
    assert!(matches!(err, Error::BranchSwitchFailed { .. }), "{err}");
    assert!(dep.resolved_version.is_none());
}

#[test]
fn unreachable_source_is_a_clone_failure() {
    let workroot = TempDir::new().unwrap();
    let missing = workroot.path().join("no-such-origin");

    let mut dep = git_dep("lib", &missing, "master", None);
    let err = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap_err();
    assert!(matches!(err, Error::CloneFailed { .. }), "{err}");
}

#[test]
fn unmanaged_working_copy_is_resolved_in_place() {
    let workroot = TempDir::new().unwrap();
    let copy = init_repo(&workroot.path().join("vendored"));
    let tip = commit_file(&copy, "a.txt", "one", "first");

    let mut dep = Dependency {
        name: "vendored".to_string(),
        requested_version: None,
        resolved_version: None,
        source: DependencySource::Git {
            repository: None,
            branch: "master".to_string(),
        },
    };
    let rev = reconcile(&mut dep, workroot.path(), &Git2Backend).unwrap();
    assert_eq!(rev, tip.to_string());
}

#[test]
fn resolve_requires_a_working_copy() {
    let workroot = TempDir::new().unwrap();
    let err = resolve(&workroot.path().join("absent"), &Git2Backend).unwrap_err();
    assert!(matches!(err, Error::NoWorkingCopy { .. }), "{err}");
}

#[test]
fn manifest_run_records_resolved_versions() {
    let origin_dir = TempDir::new().unwrap();
    let workroot = TempDir::new().unwrap();
    let origin = init_repo(origin_dir.path());
    let tip = commit_file(&origin, "a.txt", "one", "first");

    let manifest_text = format!(
        "lib:\n  type: git\n  repository: \"{}\"\n  branch: master\n",
        origin_dir.path().display()
    );
    let mut manifest = Manifest::parse(&manifest_text, "test").unwrap();

    let outcomes = reconcile_all(&mut manifest, workroot.path(), &Git2Backend, true);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(manifest.lookup_resolved_version("lib"), tip.to_string());

    // the written manifest pins what was resolved
    let out_path = workroot.path().join("resolved.yaml");
    manifest.save(&out_path).unwrap();
    let reloaded = Manifest::load(&out_path).unwrap();
    assert_eq!(
        reloaded.deps["lib"].requested_version.as_deref(),
        Some(tip.to_string().as_str())
    );
}
