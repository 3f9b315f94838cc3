//! ivy - a miniature content-addressed version-control engine
//!
//! # Core concepts
//!
//! - **Blob**: content-addressed file data (deflate-compressed)
//! - **Tree**: a serialized directory listing
//! - **Commit**: a snapshot of a tree with parent links and identity metadata
//! - **Tag**: a named, signed pointer to any object
//! - **Index**: the staging area between the working tree and the next commit
//!
//! # Hash format
//!
//! object hash = SHA1("<kind> <byte-length>\0" + body)
//!
//! # Example usage
//!
//! ```no_run
//! use ivy::{Repo, objects, index::Index};
//! use std::path::Path;
//!
//! let repo = Repo::init(Path::new("/path/to/repo")).unwrap();
//! let hash = objects::blob::write_blob(&repo, b"hello\n").unwrap();
//! assert!(objects::blob::blob_exists(&repo, &hash));
//! ```

mod codec;
mod error;
mod hash;
mod path;
mod repo;
mod time;

pub mod commands;
pub mod diff;
pub mod index;
pub mod merge;
pub mod objects;
pub mod refs;
pub mod revision;
pub mod worktree;

pub use error::{Error, Result};
pub use hash::Hash;
pub use repo::{with_lock, Repo, RepoLock};
pub use time::{Signature, SignatureKind};
