//! VFS Skeleton (§4.2): a concurrent, incrementally-populated tree of entries with blocking
//! lookup/read-directory semantics, built around the [`crate::interner::Interner`].

mod bozo;
mod create;
mod entry;
mod path_resolve;
mod read_dir;
mod stat;
mod walk;

pub use entry::{Attachment, MODE_DIR_BIT, MODE_LNK_BIT, MODE_REG_BIT};
pub use read_dir::{DirCursor, ReadDirBatch};
pub use walk::Walk;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::interner::{Handle, Interner};
pub(crate) use entry::{DirNode, EntryKind, FileNode, SymlinkNode};

/// The kind of entry a path resolves to, independent of its contents — the public face of
/// [`EntryKind`] that does not leak internal `Arc` plumbing to callers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileKind {
    Dir,
    File,
    Symlink,
}

/// Result of `stat`/`lstat`: everything about an entry except its content.
#[derive(Clone, Debug)]
pub struct Stat {
    pub kind: FileKind,
    pub mode: u32,
    pub mtime: i64,
    /// File byte length (`None` if a file's size has not yet been fixed by `set_size`), 0 for
    /// directories, and the target string's byte length for symlinks.
    pub size: Option<u64>,
}

pub(crate) enum Resolved {
    Dir(Arc<DirNode>, Handle),
    File(Arc<FileNode>, Handle),
    Symlink(Arc<SymlinkNode>, Handle),
}

/// The read-only hierarchical virtual filesystem. Cheap to share (wrap in `Arc`); every method
/// takes `&self` and synchronizes internally, one directory mutex at a time (§4.2, §5).
pub struct Vfs {
    pub(crate) interner: Interner,
    pub(crate) root: Arc<DirNode>,
    pub(crate) sealed_all: AtomicBool,
    pub(crate) global_notify: Notify,
    pub(crate) block_cache: Arc<crate::block_cache::GlobalCache>,
    pub(crate) share_pool: crate::block_cache::SharePool,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self::with_block_cache(Arc::new(crate::block_cache::GlobalCache::from_env()))
    }

    /// Builds a VFS against an explicit block cache instead of one sized from the environment —
    /// the constructor tests and multi-VFS hosts use to avoid sharing a process-wide cache.
    pub fn with_block_cache(block_cache: Arc<crate::block_cache::GlobalCache>) -> Self {
        Self {
            interner: Interner::new(),
            root: Arc::new(DirNode::new(Handle::ROOT)),
            sealed_all: AtomicBool::new(false),
            global_notify: Notify::new(),
            block_cache,
            share_pool: crate::block_cache::SharePool::new(),
        }
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed_all.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Globally forbids all further creations and unblocks every waiter tree-wide (§4.2).
    pub fn seal_all(&self) {
        self.sealed_all.store(true, std::sync::atomic::Ordering::Release);
        self.global_notify.notify_waiters();
        tracing::info!("vfs sealed globally");
    }

    /// Splits a textual path into components, tagging any failure with `operation` (the public
    /// call site this split is happening on behalf of) so the `{operation, path, kind}` triple
    /// stays accurate (§7).
    fn split_path_for(operation: &'static str, path: &str) -> VfsResult<Vec<&str>> {
        if path == "." {
            return Ok(Vec::new());
        }
        if path.is_empty() || path.starts_with('/') {
            return Err(VfsError::new(operation, path, ErrorKind::Invalid));
        }
        let mut out = Vec::new();
        for comp in path.split('/') {
            if comp.is_empty() || comp == "." || comp == ".." {
                return Err(VfsError::new(operation, path, ErrorKind::Invalid));
            }
            out.push(comp);
        }
        Ok(out)
    }

    fn split_path(path: &str) -> VfsResult<Vec<&str>> {
        Self::split_path_for("resolve", path)
    }

    pub async fn stat(&self, path: &str) -> VfsResult<Stat> {
        let resolved = self.resolve("stat", path, true).await?;
        self.stat_resolved(path, &resolved).await
    }

    pub async fn lstat(&self, path: &str) -> VfsResult<Stat> {
        let resolved = self.resolve("lstat", path, false).await?;
        self.stat_resolved(path, &resolved).await
    }

    pub async fn readlink(&self, path: &str) -> VfsResult<String> {
        let resolved = self.resolve("readlink", path, false).await?;
        match resolved {
            Resolved::Symlink(s, _) => Ok(self.interner.to_string(s.target)),
            _ => Err(VfsError::new("readlink", path, ErrorKind::Invalid)),
        }
    }

    /// Returns the full canonical path a resolved entry lives at.
    pub(crate) fn path_of(&self, handle: Handle) -> String {
        self.interner.to_string(handle)
    }

    /// Opens `path`, returning a handle supporting read + stat (directories additionally
    /// support read-directory).
    pub async fn open(&self, path: &str) -> VfsResult<crate::file_handle::File<'_>> {
        crate::file_handle::File::open(self, path).await
    }
}
