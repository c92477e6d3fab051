use anyhow::{Context, Result, anyhow, bail};
use git2::{
    BranchType, Commit, Cred, FetchOptions, ObjectType, Reference, RemoteCallbacks, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::path::Path;

use super::Vcs;

/// [`Vcs`] implementation backed by libgit2.
///
/// Authentication is delegated to the user's SSH agent (falling back to
/// libgit2's defaults), matching what the command-line git client would do
/// with ambient credentials. All checkouts use the safe strategy: local
/// modifications in a working copy make the operation fail instead of being
/// discarded.
pub struct Git2Backend;

/// Build `FetchOptions` with SSH-agent credentials enabled.
fn fetch_opts_with_creds() -> FetchOptions<'static> {
    let mut cb = RemoteCallbacks::new();
    cb.credentials(|_url, username_from_url, _allowed| {
        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")).or_else(|_| Cred::default())
    });

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(cb);
    fo
}

/// Fetch branches and tags from the `origin` remote, creating an anonymous
/// remote for `source` when the repository has none (a working copy that was
/// not produced by our own clone).
fn fetch_origin(repo: &Repository, source: &str) -> Result<()> {
    let mut fo = fetch_opts_with_creds();
    let mut remote = match repo.find_remote("origin") {
        Ok(r) => r,
        Err(_) => repo.remote_anonymous(source)?,
    };
    remote
        .fetch(
            &[
                "refs/heads/*:refs/remotes/origin/*",
                "refs/tags/*:refs/tags/*",
            ],
            Some(&mut fo),
            None,
        )
        .with_context(|| format!("fetch from {source}"))?;
    Ok(())
}

/// Update the worktree to `commit` and attach HEAD to `reference`.
fn attach(repo: &Repository, reference: &Reference, commit: &Commit) -> Result<()> {
    let name = reference
        .name()
        .ok_or_else(|| anyhow!("invalid reference name"))?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
    repo.set_head(name)?;
    Ok(())
}

/// Update the worktree to `commit` and detach HEAD at it.
fn detach(repo: &Repository, commit: &Commit) -> Result<()> {
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

/// Find or create the local branch `branch`, creating it from
/// `origin/<branch>` with upstream tracking when it only exists remotely.
fn local_branch<'r>(repo: &'r Repository, branch: &str) -> Result<Reference<'r>> {
    if let Ok(b) = repo.find_branch(branch, BranchType::Local) {
        return Ok(b.into_reference());
    }
    let remote_ref = repo
        .find_reference(&format!("refs/remotes/origin/{branch}"))
        .with_context(|| format!("branch {branch} exists neither locally nor on origin"))?;
    let tip = remote_ref.peel_to_commit()?;
    let mut b = repo.branch(branch, &tip, false)?;
    b.set_upstream(Some(&format!("origin/{branch}")))?;
    Ok(b.into_reference())
}

impl Vcs for Git2Backend {
    fn clone_repo(&self, source: &str, dest: &Path) -> Result<()> {
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_opts_with_creds());
        builder
            .clone(source, dest)
            .with_context(|| format!("clone {source}"))?;
        Ok(())
    }

    fn checkout_branch(&self, workdir: &Path, branch: &str) -> Result<()> {
        let repo = Repository::open(workdir)?;
        if let Ok(head) = repo.head()
            && head.is_branch()
            && head.shorthand() == Some(branch)
        {
            return Ok(());
        }
        let reference = local_branch(&repo, branch)?;
        let tip = reference.peel_to_commit()?;
        attach(&repo, &reference, &tip)
    }

    fn fetch_and_merge(&self, workdir: &Path, source: &str, branch: &str) -> Result<()> {
        let repo = Repository::open(workdir)?;
        fetch_origin(&repo, source)?;

        let remote_tip = repo
            .find_reference(&format!("refs/remotes/origin/{branch}"))
            .with_context(|| format!("origin has no branch {branch}"))?
            .peel_to_commit()?;
        let mut local_ref = repo
            .find_reference(&format!("refs/heads/{branch}"))
            .with_context(|| format!("no local branch {branch}"))?;
        let local_tip = local_ref.peel_to_commit()?;

        if local_tip.id() == remote_tip.id() {
            return Ok(());
        }
        if !repo.graph_descendant_of(remote_tip.id(), local_tip.id())? {
            bail!("local branch {branch} has diverged from origin/{branch} (fast-forward only)");
        }

        repo.checkout_tree(remote_tip.as_object(), Some(CheckoutBuilder::new().safe()))
            .context("fast-forward checkout")?;
        local_ref.set_target(remote_tip.id(), "fast-forward")?;
        repo.set_head(&format!("refs/heads/{branch}"))?;
        Ok(())
    }

    fn checkout_revision(&self, workdir: &Path, rev: &str) -> Result<()> {
        let repo = Repository::open(workdir)?;

        // Branch names attach, in local-then-remote order.
        if repo.find_branch(rev, BranchType::Local).is_ok()
            || repo
                .find_reference(&format!("refs/remotes/origin/{rev}"))
                .is_ok()
        {
            let reference = local_branch(&repo, rev)?;
            let tip = reference.peel_to_commit()?;
            return attach(&repo, &reference, &tip);
        }

        // Tags and raw revisions detach at the peeled commit.
        let obj = repo
            .revparse_single(&format!("refs/tags/{rev}"))
            .or_else(|_| repo.revparse_single(rev))
            .with_context(|| format!("revision not found: {rev}"))?;
        let commit = obj
            .peel(ObjectType::Commit)?
            .into_commit()
            .map_err(|_| anyhow!("{rev} does not point at a commit"))?;
        detach(&repo, &commit)
    }

    fn current_revision(&self, workdir: &Path) -> Result<String> {
        let repo = Repository::open(workdir)?;
        let head = repo.head().context("HEAD is unborn")?;
        Ok(head.peel_to_commit()?.id().to_string())
    }

    fn current_branch(&self, workdir: &Path) -> Result<String> {
        let repo = Repository::open(workdir)?;
        let head = repo.head()?;
        if !head.is_branch() {
            bail!("HEAD is detached");
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("branch name is not valid utf-8"))
    }
}
