use std::path::PathBuf;

use gitkit_hash::ObjectId;

/// Errors from read-side repository operations (§7).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a git repository (or any of the parent directories): {0}")]
    NotFound(PathBuf),

    #[error("invalid git directory: {path}: {reason}")]
    InvalidGitDir { path: PathBuf, reason: String },

    #[error("not a git repository: no HEAD resolves")]
    NotARepository,

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("invalid object type")]
    InvalidObjectType,

    #[error("corrupted repository: {0}")]
    CorruptedRepository(String),

    #[error("pack index not found")]
    PackIndexNotFound,

    #[error(transparent)]
    Odb(#[from] gitkit_odb::OdbError),

    #[error(transparent)]
    Object(#[from] gitkit_object::ObjectError),

    #[error(transparent)]
    Ref(#[from] gitkit_ref::RefError),

    #[error(transparent)]
    Index(#[from] gitkit_index::IndexError),

    #[error(transparent)]
    Diff(#[from] gitkit_diff::DiffError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from mutation-facade operations (§4.13, §7). Every variant other
/// than `GitNotFound`/`CommandFailed` corresponds to a specific mutation's
/// named failure mode; stderr sniffing (conflict markers, "nothing to
/// commit") classifies a non-zero exit into one of these rather than
/// surfacing the generic `CommandFailed`.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git binary not found on this system")]
    GitNotFound,

    #[error("`git {command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("not a git repository")]
    NotARepository,

    #[error("commit message is empty")]
    EmptyCommitMessage,

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("stage failed: {0}")]
    StageFailed(String),

    #[error("unstage failed: {0}")]
    UnstageFailed(String),

    #[error("stage hunk failed: {0}")]
    StageHunkFailed(String),

    #[error("unstage hunk failed: {0}")]
    UnstageHunkFailed(String),

    #[error("file not in index: {0}")]
    FileNotInIndex(String),

    #[error("cannot stage a hunk from an untracked file: {0}")]
    CannotStageHunkFromUntrackedFile(String),

    #[error("discard file failed: {0}")]
    DiscardFileFailed(String),

    #[error("discard hunk failed: {0}")]
    DiscardHunkFailed(String),

    #[error("discard all failed: {0}")]
    DiscardAllFailed(String),

    #[error("cherry-pick produced conflicts")]
    CherryPickConflict,

    #[error("cherry-pick failed: {0}")]
    CherryPickFailed(String),

    #[error("revert produced conflicts")]
    RevertConflict,

    #[error("revert failed: {0}")]
    RevertFailed(String),

    #[error("checkout of {branch} ({action}) failed: {stderr}")]
    CheckoutFailed {
        branch: String,
        action: &'static str,
        stderr: String,
    },

    #[error("working tree has uncommitted changes")]
    UncommittedChanges,

    #[error("delete branch failed: {0}")]
    DeleteBranchFailed(String),

    #[error("cannot delete the current branch")]
    CannotDeleteCurrentBranch,

    #[error("cannot delete a protected branch")]
    CannotDeleteProtectedBranch,

    #[error("nothing to stash")]
    NothingToStash,

    #[error("stash failed: {0}")]
    StashFailed(String),

    #[error("stash pop failed: {0}")]
    StashPopFailed(String),

    #[error("stash apply failed: {0}")]
    StashApplyFailed(String),

    #[error("stash drop failed: {0}")]
    StashDropFailed(String),

    #[error("diff failed: {0}")]
    DiffFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Repo(#[from] RepoError),
}
