//! Access to the learner's working repository.
//!
//! Level logic only sees the [`RepositoryHandle`] trait. [`GitWorkspace`] is
//! the libgit2-backed implementation; it opens the repository afresh for every
//! query so that a handle created before `git init` keeps working after it.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use git2::{BranchType, ErrorCode, IndexAddOption, Repository, Signature, Status};

use crate::config::CONFIG_FILE_NAME;
use crate::error::ProbeError;

/// Result type for repository probes.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Name and email used for commits made by level setups.
const SETUP_AUTHOR: (&str, &str) = ("gitdojo", "gitdojo@localhost");

/// Inspection and preparation of the learner's repository.
pub trait RepositoryHandle {
    /// Working directory this handle operates on.
    fn workdir(&self) -> &Path;

    /// Clears the working directory so a level can be set up from scratch.
    fn reset(&mut self) -> ProbeResult<()>;

    /// Runs `git init` in the working directory.
    fn init(&mut self) -> ProbeResult<()>;

    /// Writes a file relative to the working directory.
    fn write_file(&mut self, path: &str, contents: &str) -> ProbeResult<()>;

    /// Stages a path (`git add <path>`).
    fn stage(&mut self, path: &str) -> ProbeResult<()>;

    /// Commits the index and returns the new commit id.
    fn commit(&mut self, message: &str) -> ProbeResult<String>;

    /// Creates a branch at `HEAD` without checking it out.
    fn create_branch(&mut self, name: &str) -> ProbeResult<()>;

    /// Whether the working directory is a git repository.
    fn is_repository(&self) -> bool;

    /// Name of the branch `HEAD` points at.
    fn current_branch(&self) -> ProbeResult<String>;

    /// Local branch names.
    fn branches(&self) -> ProbeResult<Vec<String>>;

    /// Commit messages reachable from `HEAD`, newest first.
    fn commit_messages(&self) -> ProbeResult<Vec<String>>;

    /// Paths with staged changes.
    fn staged_paths(&self) -> ProbeResult<Vec<String>>;

    /// Value of a git config key, if set.
    fn config_value(&self, key: &str) -> ProbeResult<Option<String>>;

    /// Whether `path` is ignored by the repository's ignore rules.
    fn is_ignored(&self, path: &str) -> ProbeResult<bool>;
}

/// Builds repository handles for levels.
pub trait RepositoryFactory {
    /// Constructs a new handle.
    fn construct(&self) -> Box<dyn RepositoryHandle>;
}

impl<F> RepositoryFactory for F
where
    F: Fn() -> Box<dyn RepositoryHandle>,
{
    fn construct(&self) -> Box<dyn RepositoryHandle> {
        self()
    }
}

/// Factory producing [`GitWorkspace`] handles for one directory.
#[derive(Debug, Clone)]
pub struct GitWorkspaceFactory {
    root: PathBuf,
    preserve: Rc<[String]>,
    protected: Rc<[PathBuf]>,
}

impl GitWorkspaceFactory {
    /// Creates a factory for `root`, keeping `preserve` entries on reset.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, preserve: &[&str]) -> Self {
        Self {
            root: root.into(),
            preserve: preserve.iter().map(ToString::to_string).collect(),
            protected: Rc::new([]),
        }
    }

    /// Paths the handles' `reset` must never delete.
    #[must_use]
    pub fn with_protected(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.protected = paths.into_iter().collect();
        self
    }
}

impl RepositoryFactory for GitWorkspaceFactory {
    fn construct(&self) -> Box<dyn RepositoryHandle> {
        let preserve: Vec<&str> = self.preserve.iter().map(String::as_str).collect();
        Box::new(
            GitWorkspace::new(&self.root, &preserve)
                .with_protected(self.protected.iter().cloned()),
        )
    }
}

/// A git working directory accessed through libgit2.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    root: PathBuf,
    preserve: Vec<String>,
    protected: Vec<PathBuf>,
}

impl GitWorkspace {
    /// Creates a handle for `root`.
    ///
    /// `preserve` lists top-level entries `reset` leaves alone (the learner's
    /// profile, typically); they are also written to `.gitignore`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, preserve: &[&str]) -> Self {
        Self {
            root: root.into(),
            preserve: preserve.iter().map(ToString::to_string).collect(),
            protected: Vec::new(),
        }
    }

    /// Paths `reset` must never delete. A reset of a directory containing
    /// one of them fails with [`ProbeError::UnsafeReset`].
    #[must_use]
    pub fn with_protected(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.protected = paths.into_iter().collect();
        self
    }

    /// Refuses to clear a game directory or anything holding protected paths.
    fn check_reset_target(&self) -> ProbeResult<()> {
        let unsafe_reset = |reason: String| ProbeError::UnsafeReset {
            path: self.root.clone(),
            reason,
        };

        if self.root.join(CONFIG_FILE_NAME).exists() {
            return Err(unsafe_reset(format!("it holds {CONFIG_FILE_NAME}")));
        }

        let root = canonical(&self.root);
        for path in &self.protected {
            if canonical(path).starts_with(&root) {
                return Err(unsafe_reset(format!("it contains '{}'", path.display())));
            }
        }
        Ok(())
    }

    fn open(&self) -> ProbeResult<Repository> {
        Repository::open(&self.root).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                ProbeError::NotARepository {
                    path: self.root.clone(),
                }
            } else {
                ProbeError::Git(e)
            }
        })
    }

    fn write_gitignore(&self) -> ProbeResult<()> {
        if self.preserve.is_empty() {
            return Ok(());
        }
        let mut contents = self.preserve.join("\n");
        contents.push('\n');
        std::fs::write(self.root.join(".gitignore"), contents)?;
        Ok(())
    }
}

impl RepositoryHandle for GitWorkspace {
    fn workdir(&self) -> &Path {
        &self.root
    }

    fn reset(&mut self) -> ProbeResult<()> {
        self.check_reset_target()?;
        std::fs::create_dir_all(&self.root)?;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if self.preserve.iter().any(|keep| name.to_str() == Some(keep)) {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        tracing::debug!(workdir = %self.root.display(), "Working directory reset");
        self.write_gitignore()
    }

    fn init(&mut self) -> ProbeResult<()> {
        Repository::init(&self.root)?;
        Ok(())
    }

    fn write_file(&mut self, path: &str, contents: &str) -> ProbeResult<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, contents)?;
        Ok(())
    }

    fn stage(&mut self, path: &str) -> ProbeResult<()> {
        let repo = self.open()?;
        let mut index = repo.index()?;
        index.add_all([path], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> ProbeResult<String> {
        let repo = self.open()?;
        let signature = match repo.signature() {
            Ok(signature) => signature,
            Err(_) => Signature::now(SETUP_AUTHOR.0, SETUP_AUTHOR.1)?,
        };
        let mut index = repo.index()?;
        let tree = repo.find_tree(index.write_tree()?)?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    fn create_branch(&mut self, name: &str) -> ProbeResult<()> {
        let repo = self.open()?;
        let head = repo
            .head()
            .map_err(|_| ProbeError::missing("commit to branch from"))?
            .peel_to_commit()?;
        repo.branch(name, &head, false)?;
        Ok(())
    }

    fn is_repository(&self) -> bool {
        self.open().is_ok()
    }

    fn current_branch(&self) -> ProbeResult<String> {
        let repo = self.open()?;
        let head = repo.find_reference("HEAD")?;
        head.symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(ToString::to_string)
            .ok_or_else(|| ProbeError::missing("branch checked out at HEAD"))
    }

    fn branches(&self) -> ProbeResult<Vec<String>> {
        let repo = self.open()?;
        let mut names = Vec::new();
        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn commit_messages(&self) -> ProbeResult<Vec<String>> {
        let repo = self.open()?;
        let mut walk = repo.revwalk()?;
        match walk.push_head() {
            Ok(()) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }
        let mut messages = Vec::new();
        for oid in walk {
            let commit = repo.find_commit(oid?)?;
            messages.push(commit.message().unwrap_or_default().trim_end().to_string());
        }
        Ok(messages)
    }

    fn staged_paths(&self) -> ProbeResult<Vec<String>> {
        let repo = self.open()?;
        let staged = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE;
        let statuses = repo.statuses(None)?;
        Ok(statuses
            .iter()
            .filter(|entry| entry.status().intersects(staged))
            .filter_map(|entry| entry.path().map(ToString::to_string))
            .collect())
    }

    fn config_value(&self, key: &str) -> ProbeResult<Option<String>> {
        let repo = self.open()?;
        let config = repo.config()?;
        match config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_ignored(&self, path: &str) -> ProbeResult<bool> {
        let repo = self.open()?;
        Ok(repo.is_path_ignored(path)?)
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
