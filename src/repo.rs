use std::fs::File;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

use crate::error::{Error, IoResultExt, Result};
use crate::path::METADATA_DIR;

/// a repository: a working tree rooted at `path`, with its metadata under `.ivy`
pub struct Repo {
    path: PathBuf,
}

impl Repo {
    /// initialize a new repository at `path`
    pub fn init(path: &Path) -> Result<Self> {
        let meta = path.join(METADATA_DIR);
        if meta.is_dir() {
            return Err(Error::RepoExists(path.to_path_buf()));
        }

        std::fs::create_dir_all(&meta).with_path(path)?;
        std::fs::create_dir_all(meta.join("objects")).with_path(path)?;
        std::fs::create_dir_all(meta.join("refs/heads")).with_path(path)?;
        std::fs::create_dir_all(meta.join("refs/tags")).with_path(path)?;
        std::fs::create_dir_all(meta.join("tmp")).with_path(path)?;

        let head_path = meta.join("HEAD");
        std::fs::write(&head_path, "ref: refs/heads/main\n").with_path(&head_path)?;

        let repo = Self { path: path.to_path_buf() };
        crate::index::Index::new().write(&repo)?;

        Ok(repo)
    }

    /// open an existing repository rooted exactly at `path` (no upward search)
    pub fn open(path: &Path) -> Result<Self> {
        let meta = path.join(METADATA_DIR);
        if !meta.is_dir() {
            return Err(Error::NoRepo(path.to_path_buf()));
        }
        Ok(Self { path: path.to_path_buf() })
    }

    /// discover the repository root by walking upward from `start`, then open it
    pub fn discover(start: &Path) -> Result<Self> {
        let root = crate::path::find_repo_root(start)?;
        Self::open(&root)
    }

    /// working tree root
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// metadata directory (`<root>/.ivy`)
    pub fn meta_path(&self) -> PathBuf {
        self.path.join(METADATA_DIR)
    }

    pub fn objects_path(&self) -> PathBuf {
        self.meta_path().join("objects")
    }

    pub fn refs_heads_path(&self) -> PathBuf {
        self.meta_path().join("refs/heads")
    }

    pub fn refs_tags_path(&self) -> PathBuf {
        self.meta_path().join("refs/tags")
    }

    pub fn head_path(&self) -> PathBuf {
        self.meta_path().join("HEAD")
    }

    pub fn index_path(&self) -> PathBuf {
        self.meta_path().join("index")
    }

    pub fn merge_head_path(&self) -> PathBuf {
        self.meta_path().join("MERGE_HEAD")
    }

    pub fn merge_msg_path(&self) -> PathBuf {
        self.meta_path().join("MERGE_MSG")
    }

    /// path to the scratch directory used for write-temp-then-rename
    pub fn tmp_path(&self) -> PathBuf {
        self.meta_path().join("tmp")
    }

    /// a fresh temp file path inside the repository's tmp directory
    pub fn new_tmp_file(&self) -> PathBuf {
        self.tmp_path().join(uuid::Uuid::new_v4().to_string())
    }

    fn lock_path(&self) -> PathBuf {
        self.meta_path().join(".lock")
    }

    /// acquire the exclusive repository lock, blocking callers out until dropped
    pub fn lock(&self) -> Result<RepoLock> {
        let lock_path = self.lock_path();
        let file = File::create(&lock_path).with_path(&lock_path)?;

        let flock = Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|_| Error::LockContention)?;

        Ok(RepoLock { flock })
    }

    /// try to acquire the lock, returning `None` instead of blocking if contended
    pub fn try_lock(&self) -> Result<Option<RepoLock>> {
        let lock_path = self.lock_path();
        let file = File::create(&lock_path).with_path(&lock_path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => Ok(Some(RepoLock { flock })),
            Err((_, nix::errno::Errno::EWOULDBLOCK)) => Ok(None),
            Err(_) => Err(Error::LockContention),
        }
    }
}

/// guard releasing the repository lock on drop
pub struct RepoLock {
    #[allow(dead_code)]
    flock: Flock<File>,
}

/// run `f` while holding the repository's exclusive lock
pub fn with_lock<T, F>(repo: &Repo, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let _lock = repo.lock()?;
    f()
}
