//! Repository discovery and the `Repository` facade tying every gitkit
//! subsystem into a single async handle.
//!
//! Every public operation is `async fn`; I/O-heavy leaf work (index
//! parsing, loose/pack scans, subprocess invocation, file hashing) runs via
//! [`tokio::task::spawn_blocking`]. There is no internal locking beyond the
//! cache mutex: a repository handle is meant to be driven from one
//! serialized execution context (a single logical task queue per
//! repository), matching the concurrency model this crate targets.

mod cache;
mod discover;
mod error;
mod history;
mod mutation;
mod status;
mod tree;
mod worktree;

pub use cache::{Cache, CacheKey, CacheOptions, CacheStats, CacheValue, ObjectLocation};
pub use error::{GitError, RepoError};
pub use mutation::{ConflictOperation, GitCommand};
pub use status::{ChangeType as StatusChangeType, FileIdentity, FileStatus, WorkingTreeStatus};
pub use tree::{WalkControl, WalkEntry};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::stream::{self, Stream, StreamExt};
use gitkit_hash::ObjectId;
use gitkit_index::IndexSnapshot;
use gitkit_object::{Commit, Object, Tree};
use gitkit_odb::ObjectDatabase;
use gitkit_ref::{Ref, RefReader, Stash};
use tracing::debug;

/// Type of repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Normal,
    Bare,
    LinkedWorktree,
}

/// Result of repository discovery before full opening.
#[derive(Debug)]
pub struct DiscoveredRepo {
    pub git_dir: PathBuf,
    pub work_tree: Option<PathBuf>,
    pub common_dir: PathBuf,
    pub kind: RepositoryKind,
}

/// Local/remote branch names plus which local branch, if any, is checked out.
#[derive(Debug, Clone, Default)]
pub struct Branches {
    pub local: Vec<String>,
    pub remote: Vec<String>,
    pub current: Option<String>,
}

/// An 8 KiB-bounded chunk of a streamed blob (§6.4's `stream_blob`).
pub const BLOB_CHUNK_SIZE: usize = 8 * 1024;

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .field("work_tree", &self.work_tree)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The repository facade: working-tree status, a subprocess-backed
/// mutation surface, the object cache, and the public read-side API.
pub struct Repository {
    git_dir: PathBuf,
    work_tree: Option<PathBuf>,
    common_dir: PathBuf,
    kind: RepositoryKind,
    odb: Arc<ObjectDatabase>,
    refs: Arc<RefReader>,
    git_binary: PathBuf,
    cache: Arc<Mutex<Cache>>,
}

impl Repository {
    /// Open an existing repository at the given path (either the `.git`
    /// directory or the working tree root).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let discovered = if path.join("HEAD").is_file() && path.join("objects").is_dir() {
            discover::open_git_dir(path)?
        } else if path.join(".git").exists() {
            discover::open_git_dir_from_work_tree(path)?
        } else {
            return Err(RepoError::NotFound(path.to_path_buf()));
        };
        Self::from_discovered(discovered)
    }

    /// Discover a repository by walking up from `start`.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        let discovered = discover::discover_git_dir(start.as_ref())?;
        Self::from_discovered(discovered)
    }

    /// Build a repository handle with a custom cache size and a specific
    /// `git` binary, bypassing the default probing and bounds.
    pub fn open_with_options(path: impl AsRef<Path>, git_binary: PathBuf, cache_options: CacheOptions) -> Result<Self, RepoError> {
        let mut repo = Self::open(path)?;
        repo.git_binary = git_binary;
        repo.cache = Arc::new(Mutex::new(Cache::new(cache_options)));
        Ok(repo)
    }

    fn from_discovered(discovered: DiscoveredRepo) -> Result<Self, RepoError> {
        let DiscoveredRepo {
            git_dir,
            work_tree,
            common_dir,
            kind,
        } = discovered;

        debug!(git_dir = %git_dir.display(), ?kind, "opening repository");

        let odb = ObjectDatabase::open(common_dir.join("objects"))?;
        let refs = RefReader::new(common_dir.clone());
        let git_binary = mutation::find_git_binary().unwrap_or_else(|_| PathBuf::from("git"));

        Ok(Repository {
            git_dir,
            work_tree,
            common_dir,
            kind,
            odb: Arc::new(odb),
            refs: Arc::new(refs),
            git_binary,
            cache: Arc::new(Mutex::new(Cache::new(CacheOptions::default()))),
        })
    }

    // --- Path accessors ---

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    pub fn is_bare(&self) -> bool {
        self.kind == RepositoryKind::Bare
    }

    fn work_tree_or_git_dir(&self) -> &Path {
        self.work_tree.as_deref().unwrap_or(&self.git_dir)
    }

    /// Current cache statistics, exposed for testing (§4.14).
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().unwrap().stats()
    }

    // --- Object reads ---

    pub async fn get_commit(&self, hash: ObjectId) -> Result<Option<Commit>, RepoError> {
        if let Some(CacheValue::Commit(commit)) = self.cache.lock().unwrap().get(&CacheKey::Commit(hash)) {
            return Ok(Some((**commit).clone()));
        }
        let odb = self.odb.clone();
        let result = tokio::task::spawn_blocking(move || odb.read_cached(&hash))
            .await
            .expect("blocking task panicked")?;
        match result {
            Some(Object::Commit(commit)) => {
                self.cache
                    .lock()
                    .unwrap()
                    .insert(CacheKey::Commit(hash), CacheValue::Commit(Arc::new(commit.clone())));
                Ok(Some(commit))
            }
            Some(_) => Err(RepoError::InvalidObjectType),
            None => Ok(None),
        }
    }

    pub async fn get_tree(&self, hash: ObjectId) -> Result<Option<Tree>, RepoError> {
        if let Some(CacheValue::Tree(tree)) = self.cache.lock().unwrap().get(&CacheKey::Tree(hash)) {
            return Ok(Some((**tree).clone()));
        }
        let odb = self.odb.clone();
        let result = tokio::task::spawn_blocking(move || odb.read_cached(&hash))
            .await
            .expect("blocking task panicked")?;
        match result {
            Some(Object::Tree(tree)) => {
                self.cache
                    .lock()
                    .unwrap()
                    .insert(CacheKey::Tree(hash), CacheValue::Tree(Arc::new(tree.clone())));
                Ok(Some(tree))
            }
            Some(_) => Err(RepoError::InvalidObjectType),
            None => Ok(None),
        }
    }

    pub async fn get_blob(&self, hash: ObjectId) -> Result<Option<Vec<u8>>, RepoError> {
        if let Some(CacheValue::Blob(bytes)) = self.cache.lock().unwrap().get(&CacheKey::Blob(hash)) {
            return Ok(Some((**bytes).clone()));
        }
        let odb = self.odb.clone();
        let result = tokio::task::spawn_blocking(move || odb.read_cached(&hash))
            .await
            .expect("blocking task panicked")?;
        match result {
            Some(Object::Blob(blob)) => {
                let bytes = blob.serialize_content().to_vec();
                self.cache
                    .lock()
                    .unwrap()
                    .insert(CacheKey::Blob(hash), CacheValue::Blob(Arc::new(bytes.clone())));
                Ok(Some(bytes))
            }
            Some(_) => Err(RepoError::InvalidObjectType),
            None => Ok(None),
        }
    }

    /// Streams a blob's content in chunks of at most [`BLOB_CHUNK_SIZE`]
    /// bytes. Loads the whole blob up front and chunks it in memory; see
    /// `DESIGN.md` for why this is conformant without true streaming
    /// inflate.
    pub async fn stream_blob(&self, hash: ObjectId) -> Result<impl Stream<Item = Vec<u8>>, RepoError> {
        let bytes = self.get_blob(hash).await?.unwrap_or_default();
        let chunks: Vec<Vec<u8>> = bytes.chunks(BLOB_CHUNK_SIZE).map(|c| c.to_vec()).collect();
        Ok(stream::iter(chunks))
    }

    pub async fn object_exists(&self, hash: ObjectId) -> bool {
        let odb = self.odb.clone();
        tokio::task::spawn_blocking(move || odb.contains(&hash))
            .await
            .unwrap_or(false)
    }

    /// Recursively walks a tree, invoking `visitor` for every entry until
    /// it returns [`WalkControl::Stop`].
    pub async fn walk_tree<F>(&self, tree_hash: ObjectId, visitor: F) -> Result<(), RepoError>
    where
        F: FnMut(&WalkEntry) -> WalkControl + Send + 'static,
    {
        let odb = self.odb.clone();
        tokio::task::spawn_blocking(move || tree::walk_tree(&odb, &tree_hash, visitor))
            .await
            .expect("blocking task panicked")
    }

    pub async fn get_tree_paths(&self, tree_hash: ObjectId) -> Result<BTreeMap<String, ObjectId>, RepoError> {
        if let Some(CacheValue::TreePaths(paths)) = self.cache.lock().unwrap().get(&CacheKey::TreePaths(tree_hash)) {
            return Ok((**paths).clone());
        }
        let odb = self.odb.clone();
        let paths = tokio::task::spawn_blocking(move || tree::get_tree_paths(&odb, &tree_hash))
            .await
            .expect("blocking task panicked")?;
        self.cache
            .lock()
            .unwrap()
            .insert(CacheKey::TreePaths(tree_hash), CacheValue::TreePaths(Arc::new(paths.clone())));
        Ok(paths)
    }

    async fn commit_tree_paths(&self, hash: ObjectId) -> Result<BTreeMap<String, ObjectId>, RepoError> {
        let commit = self.get_commit(hash).await?.ok_or(RepoError::ObjectNotFound(hash))?;
        self.get_tree_paths(commit.tree).await
    }

    // --- Refs ---

    pub async fn get_refs(&self) -> Result<Vec<Ref>, RepoError> {
        if let Some(CacheValue::Refs(refs)) = self.cache.lock().unwrap().get(&CacheKey::Refs) {
            return Ok((**refs).clone());
        }
        let refs_reader = self.refs.clone();
        let refs = tokio::task::spawn_blocking(move || refs_reader.get_refs())
            .await
            .expect("blocking task panicked")?;
        self.cache
            .lock()
            .unwrap()
            .insert(CacheKey::Refs, CacheValue::Refs(Arc::new(refs.clone())));
        Ok(refs)
    }

    pub async fn get_head(&self) -> Result<Option<ObjectId>, RepoError> {
        if let Some(CacheValue::Head(head)) = self.cache.lock().unwrap().get(&CacheKey::Head) {
            return Ok(*head);
        }
        let refs_reader = self.refs.clone();
        let head = tokio::task::spawn_blocking(move || refs_reader.get_head())
            .await
            .expect("blocking task panicked")?;
        self.cache.lock().unwrap().insert(CacheKey::Head, CacheValue::Head(head));
        Ok(head)
    }

    pub async fn get_head_branch(&self) -> Result<Option<String>, RepoError> {
        let refs_reader = self.refs.clone();
        Ok(tokio::task::spawn_blocking(move || refs_reader.get_head_branch())
            .await
            .expect("blocking task panicked")?)
    }

    pub async fn get_branches(&self) -> Result<Branches, RepoError> {
        let refs = self.get_refs().await?;
        let current = self.get_head_branch().await?;
        let mut local = Vec::new();
        let mut remote = Vec::new();
        for r in refs {
            match r.ref_type {
                gitkit_ref::RefType::LocalBranch => local.push(r.name),
                gitkit_ref::RefType::RemoteBranch => remote.push(r.name),
                _ => {}
            }
        }
        Ok(Branches { local, remote, current })
    }

    pub async fn get_stashes(&self) -> Result<Vec<Stash>, RepoError> {
        let refs_reader = self.refs.clone();
        Ok(tokio::task::spawn_blocking(move || refs_reader.get_stashes())
            .await
            .expect("blocking task panicked")?)
    }

    // --- Commit history ---

    pub async fn get_all_commits(&self, limit: Option<usize>) -> Result<Vec<(ObjectId, Commit)>, RepoError> {
        let odb = self.odb.clone();
        let refs = self.refs.clone();
        tokio::task::spawn_blocking(move || history::get_all_commits_sorted(&odb, &refs, limit))
            .await
            .expect("blocking task panicked")
    }

    /// Yields every reachable commit BFS-by-parent-front (§4.15). Computed
    /// eagerly and wrapped in a stream rather than yielded incrementally;
    /// see `DESIGN.md` for why this is conformant.
    pub async fn stream_all_commits(&self, limit: Option<usize>) -> Result<impl Stream<Item = (ObjectId, Commit)>, RepoError> {
        let odb = self.odb.clone();
        let refs = self.refs.clone();
        let commits = tokio::task::spawn_blocking(move || history::walk_all_commits(&odb, &refs, limit))
            .await
            .expect("blocking task panicked")?;
        Ok(stream::iter(commits))
    }

    /// Streams commits BFS-by-parent-front starting from a single commit
    /// rather than from every ref.
    pub async fn stream_commits(&self, from: ObjectId, limit: Option<usize>) -> Result<impl Stream<Item = (ObjectId, Commit)>, RepoError> {
        let odb = self.odb.clone();
        let commits = tokio::task::spawn_blocking(move || {
            let mut visited = std::collections::HashSet::new();
            let mut queue = std::collections::VecDeque::new();
            visited.insert(from);
            queue.push_back(from);
            let mut out = Vec::new();
            while let Some(hash) = queue.pop_front() {
                if let Some(limit) = limit {
                    if out.len() >= limit {
                        break;
                    }
                }
                let commit = match odb.read_cached(&hash)? {
                    Some(Object::Commit(c)) => c,
                    _ => continue,
                };
                for (i, parent) in commit.parents.iter().enumerate() {
                    if visited.insert(*parent) {
                        queue.insert(i, *parent);
                    }
                }
                out.push((hash, commit));
            }
            Ok::<_, RepoError>(out)
        })
        .await
        .expect("blocking task panicked")?;
        Ok(stream::iter(commits))
    }

    pub async fn get_history(&self, from: ObjectId, limit: Option<usize>) -> Result<Vec<(ObjectId, Commit)>, RepoError> {
        let stream = self.stream_commits(from, limit).await?;
        Ok(stream.collect().await)
    }

    pub async fn get_changed_files(&self, commit_id: ObjectId) -> Result<Vec<gitkit_diff::ChangedFile>, RepoError> {
        let commit = self.get_commit(commit_id).await?.ok_or(RepoError::ObjectNotFound(commit_id))?;
        let current = self.get_tree_paths(commit.tree).await?;
        let parent = match commit.parents.first() {
            Some(parent_hash) => Some(self.commit_tree_paths(*parent_hash).await?),
            None => None,
        };
        Ok(gitkit_diff::diff_trees(&current, parent.as_ref()))
    }

    /// Diffs a single path between a commit and its first parent.
    pub async fn get_file_diff_for_commit(&self, commit_id: ObjectId, path: &str) -> Result<Vec<gitkit_diff::DiffHunk>, RepoError> {
        let commit = self.get_commit(commit_id).await?.ok_or(RepoError::ObjectNotFound(commit_id))?;
        let current_paths = self.get_tree_paths(commit.tree).await?;
        let parent_paths = match commit.parents.first() {
            Some(hash) => Some(self.commit_tree_paths(*hash).await?),
            None => None,
        };

        let new_content = match current_paths.get(path) {
            Some(hash) => String::from_utf8_lossy(&self.get_blob(*hash).await?.unwrap_or_default()).into_owned(),
            None => String::new(),
        };
        let old_content = match parent_paths.as_ref().and_then(|p| p.get(path)) {
            Some(hash) => String::from_utf8_lossy(&self.get_blob(*hash).await?.unwrap_or_default()).into_owned(),
            None => String::new(),
        };

        Ok(gitkit_diff::generate_hunks(&old_content, &new_content, &gitkit_diff::HunkOptions::default())?)
    }

    /// Diffs a working-tree file against its staged (index) content.
    pub async fn get_file_diff_for_working_file(&self, path: &str) -> Result<Vec<gitkit_diff::DiffHunk>, RepoError> {
        let index = self.load_index_snapshot().await?;
        let old_content = match index.entries_by_path.get(&bstr::BString::from(path)) {
            Some(entry) => String::from_utf8_lossy(&self.get_blob(entry.sha1).await?.unwrap_or_default()).into_owned(),
            None => String::new(),
        };

        let full_path = self.work_tree_or_git_dir().join(path);
        let new_content = tokio::task::spawn_blocking(move || std::fs::read_to_string(&full_path).unwrap_or_default())
            .await
            .unwrap_or_default();

        Ok(gitkit_diff::generate_hunks(&old_content, &new_content, &gitkit_diff::HunkOptions::default())?)
    }

    /// Diffs a staged file's index content against HEAD's tree content.
    pub async fn get_staged_diff(&self, path: &str) -> Result<Vec<gitkit_diff::DiffHunk>, RepoError> {
        let index = self.load_index_snapshot().await?;
        let new_content = match index.entries_by_path.get(&bstr::BString::from(path)) {
            Some(entry) => String::from_utf8_lossy(&self.get_blob(entry.sha1).await?.unwrap_or_default()).into_owned(),
            None => String::new(),
        };

        let old_content = match self.get_head().await? {
            Some(head) => {
                let tree_paths = self.commit_tree_paths(head).await?;
                match tree_paths.get(path) {
                    Some(hash) => String::from_utf8_lossy(&self.get_blob(*hash).await?.unwrap_or_default()).into_owned(),
                    None => String::new(),
                }
            }
            None => String::new(),
        };

        Ok(gitkit_diff::generate_hunks(&old_content, &new_content, &gitkit_diff::HunkOptions::default())?)
    }

    // --- Working-tree status ---

    async fn load_index_snapshot(&self) -> Result<Arc<IndexSnapshot>, RepoError> {
        let index_path = self.git_dir.join("index");
        let cache_key = CacheKey::IndexSnapshot(index_path.to_string_lossy().into_owned());
        if let Some(CacheValue::IndexSnapshot(snapshot)) = self.cache.lock().unwrap().get(&cache_key) {
            return Ok(snapshot.clone());
        }
        let snapshot = tokio::task::spawn_blocking(move || match IndexSnapshot::read_from(&index_path) {
            Ok(snapshot) => Ok(snapshot),
            Err(gitkit_index::IndexError::FileNotFound(_)) => Ok(IndexSnapshot {
                entries: Vec::new(),
                entries_by_path: std::collections::HashMap::new(),
                conflicted_paths: Vec::new(),
                version: 2,
            }),
            Err(e) => Err(e),
        })
        .await
        .expect("blocking task panicked")?;
        let snapshot = Arc::new(snapshot);
        self.cache
            .lock()
            .unwrap()
            .insert(cache_key, CacheValue::IndexSnapshot(snapshot.clone()));
        Ok(snapshot)
    }

    pub async fn get_working_tree_status(&self) -> Result<WorkingTreeStatus, RepoError> {
        let head_tree = match self.get_head().await? {
            Some(head) => self.commit_tree_paths(head).await?,
            None => BTreeMap::new(),
        };
        let index = self.load_index_snapshot().await?;
        let work_tree = self.work_tree_or_git_dir().to_path_buf();
        let cache = self.cache.clone();

        tokio::task::spawn_blocking(move || {
            let mut adapter = CacheFileHashAdapter { cache: &cache };
            status::compute_status(&head_tree, &index, &work_tree, &mut adapter)
        })
        .await
        .expect("blocking task panicked")
        .map_err(RepoError::Io)
    }

    pub async fn get_staged_changes(&self) -> Result<Vec<FileStatus>, RepoError> {
        Ok(self
            .get_working_tree_status()
            .await?
            .files
            .into_iter()
            .filter(|f| f.staged.is_some())
            .collect())
    }

    pub async fn get_unstaged_changes(&self) -> Result<Vec<FileStatus>, RepoError> {
        Ok(self
            .get_working_tree_status()
            .await?
            .files
            .into_iter()
            .filter(|f| f.unstaged.is_some())
            .collect())
    }

    // --- Mutations ---

    /// Invalidates cache entries after any successful mutation (§4.13's
    /// "after every successful mutation the facade invalidates the index
    /// cache and any directly invalidated keys").
    fn invalidate_after_mutation(&self) {
        let index_path = self.git_dir.join("index");
        let mut cache = self.cache.lock().unwrap();
        cache.invalidate(&CacheKey::IndexSnapshot(index_path.to_string_lossy().into_owned()));
        cache.invalidate(&CacheKey::Refs);
        cache.invalidate(&CacheKey::Head);
    }

    pub async fn commit(&self, message: &str, author: Option<&str>) -> Result<String, GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let message = message.to_string();
        let author = author.map(str::to_string);
        let result = tokio::task::spawn_blocking(move || mutation::commit(&git_binary, &repo_root, &message, author.as_deref()))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn checkout(&self, branch: &str, create: bool) -> Result<(), GitError> {
        if !create {
            let status = self.get_working_tree_status().await.map_err(GitError::Repo)?;
            if !status.files.is_empty() {
                return Err(GitError::UncommittedChanges);
            }
        }
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let branch = branch.to_string();
        let result = tokio::task::spawn_blocking(move || mutation::checkout(&git_binary, &repo_root, &branch, create))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> Result<(), GitError> {
        let current = self.get_head_branch().await.map_err(GitError::Repo)?;
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let name = name.to_string();
        let result = tokio::task::spawn_blocking(move || {
            mutation::delete_branch(&git_binary, &repo_root, &name, force, current.as_deref())
        })
        .await
        .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn cherry_pick(&self, hash: &str) -> Result<(), GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let hash = hash.to_string();
        let result = tokio::task::spawn_blocking(move || mutation::cherry_pick(&git_binary, &repo_root, &hash))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn revert(&self, hash: &str, no_commit: bool) -> Result<(), GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let hash = hash.to_string();
        let result = tokio::task::spawn_blocking(move || mutation::revert(&git_binary, &repo_root, &hash, no_commit))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn discard_file(&self, path: &str) -> Result<(), GitError> {
        let index = self.load_index_snapshot().await.map_err(GitError::Repo)?;
        let is_indexed = index.entries_by_path.contains_key(&bstr::BString::from(path));
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let path_buf = PathBuf::from(path);
        let result = tokio::task::spawn_blocking(move || mutation::discard_file(&git_binary, &repo_root, &path_buf, is_indexed))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn discard_all(&self) -> Result<(), GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let result = tokio::task::spawn_blocking(move || mutation::discard_all(&git_binary, &repo_root))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn stash_push(&self, message: Option<&str>) -> Result<(), GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let message = message.map(str::to_string);
        let result = tokio::task::spawn_blocking(move || mutation::stash_push(&git_binary, &repo_root, message.as_deref()))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn stash_pop(&self, entry: Option<&str>) -> Result<(), GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let entry = entry.map(str::to_string);
        let result = tokio::task::spawn_blocking(move || mutation::stash_pop(&git_binary, &repo_root, entry.as_deref()))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    /// Stages a single hunk against the index (`git apply --cached`).
    pub async fn stage_hunk(&self, path: &str, hunk: &gitkit_diff::DiffHunk) -> Result<(), GitError> {
        let index = self.load_index_snapshot().await.map_err(GitError::Repo)?;
        let is_indexed = index.entries_by_path.contains_key(&bstr::BString::from(path));
        let patch = gitkit_diff::format_patch(path, std::slice::from_ref(hunk));

        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let path_owned = path.to_string();
        let result = tokio::task::spawn_blocking(move || {
            mutation::stage_hunk(&git_binary, &repo_root, &path_owned, patch, is_indexed, !is_indexed)
        })
        .await
        .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    /// Unstages a single hunk by reverse-applying it with `--cached`.
    pub async fn unstage_hunk(&self, path: &str, hunk: &gitkit_diff::DiffHunk) -> Result<(), GitError> {
        let reversed = gitkit_diff::reverse_patch(hunk);
        let patch = gitkit_diff::format_patch(path, std::slice::from_ref(&reversed));

        let head_content = match self.get_head().await.map_err(GitError::Repo)? {
            Some(head) => {
                let tree_paths = self.commit_tree_paths(head).await.map_err(GitError::Repo)?;
                match tree_paths.get(path) {
                    Some(hash) => self.get_blob(*hash).await.map_err(GitError::Repo)?,
                    None => None,
                }
            }
            None => None,
        };
        let index = self.load_index_snapshot().await.map_err(GitError::Repo)?;
        let index_content = match index.entries_by_path.get(&bstr::BString::from(path)) {
            Some(entry) => self.get_blob(entry.sha1).await.map_err(GitError::Repo)?,
            None => None,
        };

        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let path_owned = path.to_string();
        let result = tokio::task::spawn_blocking(move || {
            mutation::unstage_hunk(&git_binary, &repo_root, &path_owned, patch, || {
                differs_only_by_trailing_newline(head_content.as_deref(), index_content.as_deref())
            })
        })
        .await
        .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    /// Discards a single hunk from the working tree by reverse-applying it
    /// without `--cached`.
    pub async fn discard_hunk(&self, path: &str, hunk: &gitkit_diff::DiffHunk) -> Result<(), GitError> {
        let reversed = gitkit_diff::reverse_patch(hunk);
        let patch = gitkit_diff::format_patch(path, std::slice::from_ref(&reversed));

        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let result = tokio::task::spawn_blocking(move || mutation::discard_hunk(&git_binary, &repo_root, patch))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }

    pub async fn conflict_state(&self) -> Option<ConflictOperation> {
        mutation::conflict_state(&self.git_dir)
    }

    pub async fn abort_operation(&self, operation: ConflictOperation) -> Result<(), GitError> {
        let git_binary = self.git_binary.clone();
        let repo_root = self.work_tree_or_git_dir().to_path_buf();
        let result = tokio::task::spawn_blocking(move || mutation::abort_operation(&git_binary, &repo_root, operation))
            .await
            .expect("blocking task panicked");
        if result.is_ok() {
            self.invalidate_after_mutation();
        }
        result
    }
}

/// True when `a` and `b` are identical apart from one having a trailing
/// `\n` the other lacks (§9's `unstage_hunk` cleanup trigger).
fn differs_only_by_trailing_newline(a: Option<&[u8]>, b: Option<&[u8]>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if a != b => a.strip_suffix(b"\n").unwrap_or(a) == b.strip_suffix(b"\n").unwrap_or(b),
        _ => false,
    }
}

/// Bridges [`status::FileHashCache`] onto the facade's own LRU cache under
/// [`CacheKey::FileHash`], so the stat-shortcut miss path participates in
/// the same eviction policy as every other cached read.
struct CacheFileHashAdapter<'a> {
    cache: &'a Mutex<Cache>,
}

impl status::FileHashCache for CacheFileHashAdapter<'_> {
    fn get(&mut self, identity: &FileIdentity) -> Option<ObjectId> {
        match self.cache.lock().unwrap().get(&CacheKey::FileHash(*identity)) {
            Some(CacheValue::FileHash(hash)) => Some(*hash),
            _ => None,
        }
    }

    fn put(&mut self, identity: FileIdentity, hash: ObjectId) {
        self.cache
            .lock()
            .unwrap()
            .insert(CacheKey::FileHash(identity), CacheValue::FileHash(hash));
    }
}
