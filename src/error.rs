use std::path::PathBuf;

use crate::hash::Hash;

/// error type for ivy operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a repository (or any parent up to mount point): {0}")]
    NoRepo(PathBuf),

    #[error("repository already exists at {0}")]
    RepoExists(PathBuf),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("invalid ref name: {0}")]
    InvalidRef(String),

    #[error("path not found in tree: {0}")]
    PathNotFound(String),

    #[error("object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("corrupt object: hash mismatch for {0}")]
    CorruptObject(Hash),

    #[error("corrupt object {0}: {1}")]
    CorruptObjectMessage(Hash, String),

    #[error("invalid object header: {0}")]
    InvalidObjectHeader(String),

    #[error("invalid object type: {0}")]
    InvalidObjectType(String),

    #[error("ambiguous short hash {0}: matches {1} objects")]
    AmbiguousHash(String, usize),

    #[error("no object matches short hash {0}")]
    NoSuchShortHash(String),

    #[error("short hash must be at least 4 characters: {0}")]
    ShortHashTooShort(String),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("cannot resolve reference: {0}")]
    CannotResolveReference(String),

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("checkout target not empty: {0}")]
    TargetNotEmpty(PathBuf),

    #[error("uncommitted changes would be overwritten by checkout")]
    WouldOverwriteChanges,

    #[error("lock contention on repository")]
    LockContention,

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("branch not fully merged: {0}")]
    BranchNotMerged(String),

    #[error("cannot delete the currently checked out branch: {0}")]
    CannotDeleteCurrentBranch(String),

    #[error("tag already exists: {0}")]
    TagExists(String),

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("merge conflict in {0} file(s)")]
    MergeConflict(usize),

    #[error("unrelated histories: no common ancestor between {0} and {1}")]
    UnrelatedHistories(Hash, Hash),

    #[error("no merge in progress")]
    NoMergeInProgress,

    #[error("cycle detected while walking history at {0}")]
    CycleInHistory(Hash),

    #[error("a topological sort cannot be performed on a graph with a cycle")]
    NotADag,

    #[error("invalid patch: {0}")]
    PatchParse(String),

    #[error("invalid conflict choice: {0}")]
    InvalidConflictChoice(String),

    #[error("conflict index {0} out of range (patch has {1})")]
    ConflictIndexOutOfRange(usize, usize),

    #[error("working tree path is not valid utf-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
