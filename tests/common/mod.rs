use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use archive_vfs::{ByteSource, RandomAccessRead, SequentialFactory, Vfs};
use tempfile::TempDir;

/// An in-memory eager byte source, the cheapest variant a front end can attach (§4.3).
pub struct MemReader(pub Vec<u8>);

impl RandomAccessRead for MemReader {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let offset = offset as usize;
        if offset >= self.0.len() {
            return Ok(0);
        }
        let n = std::cmp::min(buf.len(), self.0.len() - offset);
        buf[..n].copy_from_slice(&self.0[offset..offset + n]);
        Ok(n)
    }
}

pub fn eager(data: &[u8]) -> ByteSource {
    ByteSource::Eager(Arc::new(MemReader(data.to_vec())))
}

/// A sequential factory backed by a real on-disk file, reopened fresh on every `open()` call —
/// the behavior the Block Cache Adapter assumes of its factories (§4.3).
pub struct TempFileFactory {
    pub path: PathBuf,
}

impl SequentialFactory for TempFileFactory {
    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(std::fs::File::open(&self.path)?))
    }
}

/// Fixture mirroring the shadow-fs pattern this crate's teacher used: a scratch directory on
/// disk plus a freshly constructed VFS under test.
pub struct Fixture {
    pub tempdir: TempDir,
    pub vfs: Vfs,
}

impl Fixture {
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let vfs = Vfs::with_block_cache(Arc::new(archive_vfs::block_cache::GlobalCache::new(1024 * 1024)));
        Self { tempdir, vfs }
    }

    pub fn write_file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.tempdir.path().join(name);
        std::fs::write(&path, data).expect("write fixture file");
        path
    }

    pub fn sequential_factory(&self, name: &str, data: &[u8]) -> Arc<TempFileFactory> {
        Arc::new(TempFileFactory { path: self.write_file(name, data) })
    }
}
