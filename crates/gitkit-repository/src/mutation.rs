//! Mutation facade (§4.13): every write operation shells out to the real
//! `git` binary rather than re-implementing write paths, since the
//! repository's on-disk format guarantees (hooks, reflogs, `gc` triggers)
//! are easiest to keep correct by delegating to git itself. Grounded on
//! the same "invoke the real binary, classify stderr" shape the teacher
//! used for its own subprocess plumbing.

use std::path::{Path, PathBuf};
use std::process::Output;

use tracing::{debug, warn};

use crate::GitError;

const PROTECTED_BRANCHES: &[&str] = &["main", "master", "develop", "production", "staging"];

/// One invocation of the `git` binary (§9: tagged variants, not a class
/// hierarchy of command objects).
#[derive(Debug, Clone)]
pub enum GitCommand {
    Add { path: PathBuf },
    AddAll,
    ResetPath { path: PathBuf },
    ResetAll,
    Commit { message: String, author: Option<String> },
    Checkout { branch: String, create: bool },
    DeleteBranch { name: String, force: bool },
    Apply { cached: bool, patch: String },
    RestorePath { path: PathBuf },
    RestoreAll,
    ResetHard,
    CleanForceDirs,
    StashPush { message: Option<String> },
    StashPop { entry: Option<String> },
    StashApply { entry: Option<String> },
    StashDrop { entry: String },
    CherryPick { hash: String },
    Revert { hash: String, no_commit: bool },
    AbortMerge,
    AbortCherryPick,
    AbortRevert,
    DiffCached { path: PathBuf },
    DiffWorking { path: PathBuf },
    DiffTreeNameStatus { commit: String },
    DiffRange { from: String, to: String, path: PathBuf },
    Show { commit: String, path: PathBuf },
}

impl GitCommand {
    fn args(&self) -> Vec<String> {
        match self {
            GitCommand::Add { path } => vec!["add".into(), "--".into(), path_str(path)],
            GitCommand::AddAll => vec!["add".into(), "--all".into()],
            GitCommand::ResetPath { path } => vec!["reset".into(), "HEAD".into(), "--".into(), path_str(path)],
            GitCommand::ResetAll => vec!["reset".into(), "HEAD".into()],
            GitCommand::Commit { message, author } => {
                let mut v = vec!["commit".into(), "-m".into(), message.clone()];
                if let Some(a) = author {
                    v.push("--author".into());
                    v.push(a.clone());
                }
                v
            }
            GitCommand::Checkout { branch, create } => {
                let mut v = vec!["checkout".into()];
                if *create {
                    v.push("-b".into());
                }
                v.push(branch.clone());
                v
            }
            GitCommand::DeleteBranch { name, force } => {
                vec!["branch".into(), if *force { "-D".into() } else { "-d".into() }, name.clone()]
            }
            GitCommand::Apply { cached, .. } => {
                let mut v = vec!["apply".into()];
                if *cached {
                    v.push("--cached".into());
                }
                v.push("--ignore-whitespace".into());
                v.push("--unidiff-zero".into());
                v.push("--whitespace=nowarn".into());
                v
            }
            GitCommand::RestorePath { path } => vec!["restore".into(), "--".into(), path_str(path)],
            GitCommand::RestoreAll => vec!["restore".into(), ".".into()],
            GitCommand::ResetHard => vec!["reset".into(), "--hard".into(), "HEAD".into()],
            GitCommand::CleanForceDirs => vec!["clean".into(), "-f".into(), "-d".into()],
            GitCommand::StashPush { message } => {
                let mut v = vec!["stash".into(), "push".into()];
                if let Some(m) = message {
                    v.push("-m".into());
                    v.push(m.clone());
                }
                v
            }
            GitCommand::StashPop { entry } => {
                let mut v = vec!["stash".into(), "pop".into()];
                if let Some(e) = entry {
                    v.push(e.clone());
                }
                v
            }
            GitCommand::StashApply { entry } => {
                let mut v = vec!["stash".into(), "apply".into()];
                if let Some(e) = entry {
                    v.push(e.clone());
                }
                v
            }
            GitCommand::StashDrop { entry } => vec!["stash".into(), "drop".into(), entry.clone()],
            GitCommand::CherryPick { hash } => vec!["cherry-pick".into(), hash.clone()],
            GitCommand::Revert { hash, no_commit } => {
                let mut v = vec!["revert".into()];
                if *no_commit {
                    v.push("--no-commit".into());
                }
                v.push(hash.clone());
                v
            }
            GitCommand::AbortMerge => vec!["merge".into(), "--abort".into()],
            GitCommand::AbortCherryPick => vec!["cherry-pick".into(), "--abort".into()],
            GitCommand::AbortRevert => vec!["revert".into(), "--abort".into()],
            GitCommand::DiffCached { path } => vec!["diff".into(), "--cached".into(), path_str(path)],
            GitCommand::DiffWorking { path } => vec!["diff".into(), path_str(path)],
            GitCommand::DiffTreeNameStatus { commit } => vec![
                "diff-tree".into(),
                "--no-commit-id".into(),
                "--name-status".into(),
                "-r".into(),
                "-M".into(),
                commit.clone(),
            ],
            GitCommand::DiffRange { from, to, path } => vec!["diff".into(), from.clone(), to.clone(), "--".into(), path_str(path)],
            GitCommand::Show { commit, path } => vec!["show".into(), format!("{commit}:{}", path_str(path))],
        }
    }

    fn stdin_patch(&self) -> Option<&str> {
        match self {
            GitCommand::Apply { patch, .. } => Some(patch.as_str()),
            _ => None,
        }
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Locates the `git` binary by probing known install locations (§6.3).
pub fn find_git_binary() -> Result<PathBuf, GitError> {
    for candidate in ["/usr/bin/git", "/opt/homebrew/bin/git", "/usr/local/bin/git"] {
        let path = PathBuf::from(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }
    if cfg!(target_os = "macos") {
        if let Ok(output) = std::process::Command::new("xcrun").args(["-f", "git"]).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }
    Err(GitError::GitNotFound)
}

/// Runs a single `git` invocation with `repo_root` as CWD, optionally
/// feeding `stdin_patch` to the child's stdin, and captures the result.
pub fn run_git(git_binary: &Path, repo_root: &Path, command: &GitCommand) -> Result<Output, GitError> {
    use std::io::Write;
    use std::process::Stdio;

    let args = command.args();
    debug!(command = ?args, "running git subprocess");

    let mut child = std::process::Command::new(git_binary)
        .args(&args)
        .current_dir(repo_root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(patch) = command.stdin_patch() {
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(patch.as_bytes())?;
    } else {
        drop(child.stdin.take());
    }

    Ok(child.wait_with_output()?)
}

fn command_label(command: &GitCommand) -> String {
    command.args().join(" ")
}

fn classify_failure(command: &GitCommand, output: &Output) -> GitError {
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    GitError::CommandFailed {
        command: command_label(command),
        stderr,
    }
}

/// Commits staged changes. Fails fast on an empty message without shelling
/// out; a non-zero `git commit` exit whose stderr mentions no staged
/// changes is remapped to [`GitError::NothingToCommit`].
pub fn commit(git_binary: &Path, repo_root: &Path, message: &str, author: Option<&str>) -> Result<String, GitError> {
    if message.trim().is_empty() {
        return Err(GitError::EmptyCommitMessage);
    }
    let command = GitCommand::Commit {
        message: message.to_string(),
        author: author.map(str::to_string),
    };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("nothing to commit") || stderr.contains("no changes added to commit") {
            return Err(GitError::NothingToCommit);
        }
        return Err(GitError::CommitFailed(stderr.into_owned()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Stages a single hunk by applying its forward patch to the index.
/// Requires `path` to already be tracked and not purely untracked.
pub fn stage_hunk(
    git_binary: &Path,
    repo_root: &Path,
    path: &str,
    patch: String,
    path_is_indexed: bool,
    path_is_untracked_only: bool,
) -> Result<(), GitError> {
    if !path_is_indexed {
        return Err(GitError::FileNotInIndex(path.to_string()));
    }
    if path_is_untracked_only {
        return Err(GitError::CannotStageHunkFromUntrackedFile(path.to_string()));
    }
    let command = GitCommand::Apply { cached: true, patch };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::StageHunkFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(())
}

/// Unstages a single hunk by applying its reverse patch with `--cached`.
/// `head_index_differ_only_by_trailing_newline` lets the caller ask for
/// the `git reset HEAD -- <path>` cleanup documented in §4.13, which
/// papers over a `git apply` idiosyncrasy around trailing newlines.
pub fn unstage_hunk(
    git_binary: &Path,
    repo_root: &Path,
    path: &str,
    reverse_patch: String,
    head_index_differ_only_by_trailing_newline: impl FnOnce() -> bool,
) -> Result<(), GitError> {
    let command = GitCommand::Apply { cached: true, patch: reverse_patch };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::UnstageHunkFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    if head_index_differ_only_by_trailing_newline() {
        let reset = GitCommand::ResetPath { path: PathBuf::from(path) };
        let _ = run_git(git_binary, repo_root, &reset);
    }
    Ok(())
}

/// Discards a single hunk by applying its reverse patch against the
/// working tree (no `--cached`).
pub fn discard_hunk(git_binary: &Path, repo_root: &Path, reverse_patch: String) -> Result<(), GitError> {
    let command = GitCommand::Apply { cached: false, patch: reverse_patch };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::DiscardHunkFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(())
}

/// Discards all changes to a single file: `git restore` when tracked,
/// a plain filesystem delete when untracked.
pub fn discard_file(git_binary: &Path, repo_root: &Path, path: &Path, is_indexed: bool) -> Result<(), GitError> {
    if is_indexed {
        let command = GitCommand::RestorePath { path: path.to_path_buf() };
        let output = run_git(git_binary, repo_root, &command)?;
        if !output.status.success() {
            return Err(GitError::DiscardFileFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
        Ok(())
    } else {
        std::fs::remove_file(repo_root.join(path)).map_err(|e| GitError::DiscardFileFailed(e.to_string()))
    }
}

/// Discards every working-tree and index change: `restore .` followed by
/// `reset --hard HEAD` and an untracked-file sweep.
pub fn discard_all(git_binary: &Path, repo_root: &Path) -> Result<(), GitError> {
    for command in [GitCommand::RestoreAll, GitCommand::ResetHard, GitCommand::CleanForceDirs] {
        let output = run_git(git_binary, repo_root, &command)?;
        if !output.status.success() {
            return Err(GitError::DiscardAllFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
        }
    }
    Ok(())
}

fn looks_like_conflict(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    stderr.contains("conflict") || stderr.contains("CONFLICT") || stdout.contains("conflict") || stdout.contains("CONFLICT")
}

pub fn cherry_pick(git_binary: &Path, repo_root: &Path, hash: &str) -> Result<(), GitError> {
    let command = GitCommand::CherryPick { hash: hash.to_string() };
    let output = run_git(git_binary, repo_root, &command)?;
    if output.status.success() {
        return Ok(());
    }
    if looks_like_conflict(&output) {
        return Err(GitError::CherryPickConflict);
    }
    Err(GitError::CherryPickFailed(String::from_utf8_lossy(&output.stderr).into_owned()))
}

pub fn revert(git_binary: &Path, repo_root: &Path, hash: &str, no_commit: bool) -> Result<(), GitError> {
    let command = GitCommand::Revert { hash: hash.to_string(), no_commit };
    let output = run_git(git_binary, repo_root, &command)?;
    if output.status.success() {
        return Ok(());
    }
    if looks_like_conflict(&output) {
        return Err(GitError::RevertConflict);
    }
    Err(GitError::RevertFailed(String::from_utf8_lossy(&output.stderr).into_owned()))
}

/// Checks out a branch. When `create` is false the caller must have
/// already verified the working tree is clean (`UncommittedChanges` is
/// the status engine's job, not this function's, to keep subprocess
/// invocation and status computation independent).
pub fn checkout(git_binary: &Path, repo_root: &Path, branch: &str, create: bool) -> Result<(), GitError> {
    let command = GitCommand::Checkout { branch: branch.to_string(), create };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::CheckoutFailed {
            branch: branch.to_string(),
            action: if create { "create" } else { "switch" },
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

pub fn delete_branch(
    git_binary: &Path,
    repo_root: &Path,
    name: &str,
    force: bool,
    current_branch: Option<&str>,
) -> Result<(), GitError> {
    if current_branch == Some(name) {
        return Err(GitError::CannotDeleteCurrentBranch);
    }
    if PROTECTED_BRANCHES.contains(&name) {
        return Err(GitError::CannotDeleteProtectedBranch);
    }
    let command = GitCommand::DeleteBranch { name: name.to_string(), force };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::DeleteBranchFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(())
}

pub fn stash_push(git_binary: &Path, repo_root: &Path, message: Option<&str>) -> Result<(), GitError> {
    let command = GitCommand::StashPush { message: message.map(str::to_string) };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("No local changes to save") {
            return Err(GitError::NothingToStash);
        }
        return Err(GitError::StashFailed(stderr.into_owned()));
    }
    Ok(())
}

pub fn stash_pop(git_binary: &Path, repo_root: &Path, entry: Option<&str>) -> Result<(), GitError> {
    let command = GitCommand::StashPop { entry: entry.map(str::to_string) };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::StashPopFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(())
}

pub fn stash_apply(git_binary: &Path, repo_root: &Path, entry: Option<&str>) -> Result<(), GitError> {
    let command = GitCommand::StashApply { entry: entry.map(str::to_string) };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::StashApplyFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(())
}

pub fn stash_drop(git_binary: &Path, repo_root: &Path, entry: &str) -> Result<(), GitError> {
    let command = GitCommand::StashDrop { entry: entry.to_string() };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        return Err(GitError::StashDropFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(())
}

/// Which in-progress operation, if any, is in the middle of resolving
/// conflicts. A bare bool wouldn't tell `abort_operation` which `--abort`
/// to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictOperation {
    Merge,
    CherryPick,
    Revert,
}

pub fn conflict_state(git_dir: &Path) -> Option<ConflictOperation> {
    if git_dir.join("MERGE_HEAD").is_file() {
        Some(ConflictOperation::Merge)
    } else if git_dir.join("CHERRY_PICK_HEAD").is_file() {
        Some(ConflictOperation::CherryPick)
    } else if git_dir.join("REVERT_HEAD").is_file() {
        Some(ConflictOperation::Revert)
    } else {
        None
    }
}

pub fn abort_operation(git_binary: &Path, repo_root: &Path, operation: ConflictOperation) -> Result<(), GitError> {
    let command = match operation {
        ConflictOperation::Merge => GitCommand::AbortMerge,
        ConflictOperation::CherryPick => GitCommand::AbortCherryPick,
        ConflictOperation::Revert => GitCommand::AbortRevert,
    };
    let output = run_git(git_binary, repo_root, &command)?;
    if !output.status.success() {
        warn!(stderr = %String::from_utf8_lossy(&output.stderr), "abort produced a non-zero exit");
        return Err(classify_failure(&command, &output));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_rejects_blank_message_without_shelling_out() {
        let err = commit(Path::new("/usr/bin/git"), Path::new("/tmp"), "   ", None).unwrap_err();
        assert!(matches!(err, GitError::EmptyCommitMessage));
    }

    #[test]
    fn stage_hunk_rejects_untracked_and_unindexed_without_shelling_out() {
        let err = stage_hunk(Path::new("/usr/bin/git"), Path::new("/tmp"), "a.txt", String::new(), false, false).unwrap_err();
        assert!(matches!(err, GitError::FileNotInIndex(_)));

        let err = stage_hunk(Path::new("/usr/bin/git"), Path::new("/tmp"), "a.txt", String::new(), true, true).unwrap_err();
        assert!(matches!(err, GitError::CannotStageHunkFromUntrackedFile(_)));
    }

    #[test]
    fn delete_branch_rejects_protected_and_current_names() {
        let err = delete_branch(Path::new("/usr/bin/git"), Path::new("/tmp"), "feature", false, Some("feature")).unwrap_err();
        assert!(matches!(err, GitError::CannotDeleteCurrentBranch));

        let err = delete_branch(Path::new("/usr/bin/git"), Path::new("/tmp"), "main", false, Some("feature")).unwrap_err();
        assert!(matches!(err, GitError::CannotDeleteProtectedBranch));
    }

    #[test]
    fn conflict_state_reads_marker_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(conflict_state(dir.path()), None);
        std::fs::write(dir.path().join("MERGE_HEAD"), b"abc\n").unwrap();
        assert_eq!(conflict_state(dir.path()), Some(ConflictOperation::Merge));
    }

    #[test]
    fn command_args_match_subprocess_contract() {
        assert_eq!(
            GitCommand::Add { path: PathBuf::from("a.txt") }.args(),
            vec!["add", "--", "a.txt"]
        );
        assert_eq!(
            GitCommand::DiffTreeNameStatus { commit: "abc".into() }.args(),
            vec!["diff-tree", "--no-commit-id", "--name-status", "-r", "-M", "abc"]
        );
        assert_eq!(
            GitCommand::Apply { cached: true, patch: String::new() }.args(),
            vec!["apply", "--cached", "--ignore-whitespace", "--unidiff-zero", "--whitespace=nowarn"]
        );
    }
}
