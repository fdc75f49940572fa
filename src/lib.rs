//! A read-only, hierarchical virtual filesystem over archive-like containers (ZIP, TAR, WebDAV
//! front ends). The crate itself never parses a container format; it supplies the three hard
//! pieces any such front end needs: a path interner, a concurrently-populated directory tree
//! with blocking lookup semantics, and a block-caching adapter that turns a sequential
//! decompression stream into a random-access byte source.

pub mod block_cache;
pub mod bytesource;
pub mod checksum;
pub mod error;
pub mod file_handle;
pub mod interner;
pub mod vfs;

pub use bytesource::{ByteSource, RandomAccessFactory, RandomAccessRead, SequentialFactory};
pub use error::{ErrorKind, VfsError, VfsResult};
pub use file_handle::File;
pub use interner::{Handle, Interner};
pub use vfs::{FileKind, Stat, Vfs};
