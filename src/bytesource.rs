//! Byte Source (§4.3): the tagged union an archive front end attaches to a file entry, plus the
//! two factory traits lazy variants are built from.

use std::io;
use std::sync::Arc;

/// Read access at an arbitrary offset, without disturbing any other reader's position. Archive
/// front ends implement this over their own already-open file or mapped region.
pub trait RandomAccessRead: Send + Sync {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

/// Produces a fresh sequential reader, always starting at offset 0. Reopening is the only way
/// to rewind a sequential source (§4.3); the Block Cache Adapter is what makes that cheap.
pub trait SequentialFactory: Send + Sync {
    fn open(&self) -> io::Result<Box<dyn io::Read + Send>>;
}

/// Produces a [`RandomAccessRead`] on first use. Unlike [`SequentialFactory`], the product is
/// already seekable, so it is realized once and reused directly without block caching.
pub trait RandomAccessFactory: Send + Sync {
    fn open(&self) -> io::Result<Arc<dyn RandomAccessRead>>;
}

/// What a file entry is backed by. Exactly one variant attaches per entry (§4.3); the caller
/// (archive front end) picks the cheapest one its container format supports.
pub enum ByteSource {
    /// Already in memory or already random-access; no caching needed.
    Eager(Arc<dyn RandomAccessRead>),
    /// Expensive to open and only readable front-to-back (e.g. a streaming decompressor); the
    /// Block Cache Adapter wraps this to give callers the illusion of random access.
    LazySequential(Arc<dyn SequentialFactory>),
    /// Expensive to open but already seekable once opened; realized lazily, then reused as-is.
    LazyRandomAccess(Arc<dyn RandomAccessFactory>),
    /// The front end could not produce bytes for this entry at all; every read fails with the
    /// carried error (CRC failures surfaced while indexing an archive are the common case).
    Error(Arc<io::Error>),
}

impl Clone for ByteSource {
    fn clone(&self) -> Self {
        match self {
            ByteSource::Eager(r) => ByteSource::Eager(r.clone()),
            ByteSource::LazySequential(f) => ByteSource::LazySequential(f.clone()),
            ByteSource::LazyRandomAccess(f) => ByteSource::LazyRandomAccess(f.clone()),
            ByteSource::Error(e) => ByteSource::Error(e.clone()),
        }
    }
}
