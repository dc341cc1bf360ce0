use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::{process, tag};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git failed to find branch")]
    Branch(#[source] process::Error),

    #[error("git failed to get hash")]
    CommitHash(#[source] process::Error),

    #[error("git failed to read the working tree status")]
    Status(#[source] process::Error),

    #[error("git failed to check whether {path:?} is ignored")]
    CheckIgnore {
        path: PathBuf,
        source: process::Error,
    },

    #[error("git output is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("git reported an empty branch name for {0:?}")]
    EmptyBranch(PathBuf),
}

pub type Result<T, E = GitError> = std::result::Result<T, E>;

/// Runs git commands inside a single repository.
pub struct Git<'a> {
    root: &'a Path,
}

impl<'a> Git<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    fn git(&self) -> process::Command {
        process::Command::new("git").current_dir(self.root)
    }

    /// Returns the short name of the checked out branch. Fails when `HEAD` is detached.
    pub fn branch(&self) -> Result<String> {
        let output = process::args!(self.git(), "symbolic-ref", "--short", "HEAD")
            .output()
            .map_err(GitError::Branch)?;

        Ok(output.stdout_trimmed()?.to_owned())
    }

    /// Returns the full commit hash of `HEAD`.
    pub fn commit_hash(&self) -> Result<String> {
        let output = process::args!(self.git(), "rev-parse", "--verify", "HEAD")
            .output()
            .map_err(GitError::CommitHash)?;

        Ok(output.stdout_trimmed()?.to_owned())
    }

    /// Returns true if there are no uncommitted or untracked files, and false otherwise. Files
    /// matched by `.gitignore` do not count.
    pub fn is_clean(&self) -> Result<bool> {
        let output = process::args!(self.git(), "status", "--porcelain")
            .output()
            .map_err(GitError::Status)?;

        Ok(output.stdout_trimmed()?.is_empty())
    }

    /// Returns true if git ignores `path`, relative to the repository root. Tracked files are
    /// never ignored.
    pub fn is_ignored(&self, path: &Path) -> Result<bool> {
        let status = process::args!(self.git(), "check-ignore", "--quiet", path)
            .try_status()
            .map_err(|source| GitError::CheckIgnore {
                path: path.to_owned(),
                source,
            })?;

        // Exit code 1 means "not ignored", anything else but 0 is a failure.
        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => status
                .require_success()
                .map(|()| true)
                .map_err(|source| GitError::CheckIgnore {
                    path: path.to_owned(),
                    source,
                }),
        }
    }

    /// Returns the git tags pointing at `HEAD` that should be replicated as image tags.
    pub fn release_tags(&self) -> Vec<String> {
        warn!("Tags are not currently replicated into the Docker repository. Be advised when using release tags.");
        Vec::new()
    }

    /// Returns the current branch name converted into a valid image tag.
    pub fn branch_tag(&self) -> Result<String> {
        let branch = self.branch()?;
        let branch_tag = tag::to_image_tag_lossy(&branch)
            .ok_or_else(|| GitError::EmptyBranch(self.root.to_owned()))?;
        debug!("branch {branch:?} is tagged as {branch_tag:?}");
        Ok(branch_tag.into_owned())
    }

    /// Returns the tag of the base image derived from the current branch.
    pub fn parent_tag(&self) -> Result<&'static str> {
        Ok(tag::parent_tag(&self.branch()?))
    }

    /// Returns every tag a freshly built image should receive: the commit hash, the branch tag
    /// and the release tags, in that order.
    pub fn image_tags(&self) -> Result<Vec<String>> {
        let mut tags = vec![self.commit_hash()?, self.branch_tag()?];
        tags.extend(self.release_tags());
        Ok(tags)
    }
}
