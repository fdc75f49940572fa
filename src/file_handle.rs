//! Open-file glue (§2, §6): the thin object `open(path)` returns, implementing read + stat and,
//! for directories, read-directory.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;

use crate::bytesource::{ByteSource, RandomAccessRead};
use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::vfs::{DirCursor, FileKind, FileNode, ReadDirBatch, Resolved, Stat, Vfs};

enum Realized {
    /// Already random-access; used directly.
    Direct(Arc<dyn RandomAccessRead>),
    /// Sequential factory wrapped by the process-wide block cache.
    Cached(Arc<crate::block_cache::BlockCacheAdapter>),
    /// Random-access factory, opened lazily on first use.
    LazyRandomAccess {
        factory: Arc<dyn crate::bytesource::RandomAccessFactory>,
        opened: SyncMutex<Option<Arc<dyn RandomAccessRead>>>,
    },
    /// The byte source is itself a stored error; every read replays it.
    Error(Arc<io::Error>),
}

enum OpenKind {
    Dir(DirCursor),
    Regular { reader: Realized, pos: u64 },
    Symlink,
}

/// An open file, directory, or symlink. Reading and stat go through this object rather than
/// through `Vfs` directly so a caller can hold a stable cursor/position across calls.
pub struct File<'a> {
    vfs: &'a Vfs,
    path: String,
    kind: OpenKind,
}

impl<'a> File<'a> {
    pub(crate) async fn open(vfs: &'a Vfs, path: &str) -> VfsResult<File<'a>> {
        let resolved = vfs.resolve("open", path, true).await?;
        let kind = match &resolved {
            Resolved::Dir(dir, _) => OpenKind::Dir(DirCursor::new(dir.clone())),
            Resolved::File(file, _) => OpenKind::Regular { reader: realize(vfs, file), pos: 0 },
            Resolved::Symlink(_, _) => OpenKind::Symlink,
        };
        Ok(File { vfs, path: path.to_string(), kind })
    }

    pub async fn stat(&self) -> VfsResult<Stat> {
        self.vfs.stat(&self.path).await
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        match &mut self.kind {
            OpenKind::Regular { reader, pos } => {
                let n = read_from(reader, buf, *pos).map_err(|e| VfsError::io("read", self.path.clone(), e))?;
                *pos += n as u64;
                Ok(n)
            }
            OpenKind::Dir(_) | OpenKind::Symlink => Err(VfsError::new("read", &self.path, ErrorKind::Invalid)),
        }
    }

    pub async fn read_dir(&mut self, count: i64) -> VfsResult<ReadDirBatch> {
        match &mut self.kind {
            OpenKind::Dir(cursor) => cursor.read_dir(self.vfs, count).await,
            _ => Err(VfsError::new("read_dir", &self.path, ErrorKind::Invalid)),
        }
    }

    pub fn kind(&self) -> FileKind {
        match &self.kind {
            OpenKind::Dir(_) => FileKind::Dir,
            OpenKind::Regular { .. } => FileKind::File,
            OpenKind::Symlink => FileKind::Symlink,
        }
    }

    /// Closing an open file is always infallible, even over a stored "error" byte source (§7).
    pub fn close(self) {}
}

fn realize(vfs: &Vfs, file: &Arc<FileNode>) -> Realized {
    match file.source.clone() {
        ByteSource::Eager(r) => Realized::Direct(r),
        ByteSource::LazySequential(factory) => {
            let adapter = vfs.share_pool.get_or_create(file.handle, vfs.block_cache.clone(), factory);
            Realized::Cached(adapter)
        }
        ByteSource::LazyRandomAccess(factory) => Realized::LazyRandomAccess { factory, opened: SyncMutex::new(None) },
        ByteSource::Error(e) => Realized::Error(e),
    }
}

fn read_from(reader: &Realized, buf: &mut [u8], pos: u64) -> io::Result<usize> {
    match reader {
        Realized::Direct(r) => r.read_at(buf, pos),
        Realized::Cached(adapter) => adapter.read_at(buf, pos),
        Realized::LazyRandomAccess { factory, opened } => {
            let mut slot = opened.lock();
            if slot.is_none() {
                *slot = Some(factory.open()?);
            }
            slot.as_ref().expect("just populated").read_at(buf, pos)
        }
        Realized::Error(e) => Err(io::Error::new(e.kind(), SharedError(e.clone()))),
    }
}

#[derive(Debug)]
struct SharedError(Arc<io::Error>);

impl std::fmt::Display for SharedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SharedError {}
