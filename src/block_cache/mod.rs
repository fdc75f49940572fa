//! Block Cache Adapter (§4.3): makes a [`crate::bytesource::SequentialFactory`] look
//! random-access by caching fixed-size blocks in a process-wide LRU and advancing the one live
//! sequential reader only as far forward as a request actually needs.
//!
//! Synchronous by design: nothing here ever awaits, it only blocks on the factory (§4.3).

mod pool;

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use parking_lot::Mutex;

pub use pool::SharePool;

use crate::bytesource::SequentialFactory;
use crate::interner::Handle;

const BLOCK_SIZE: usize = 4096;
const DEFAULT_BUDGET_GIB: f64 = 1.0;

/// The process-wide LRU of cached blocks, sized in whole blocks rather than by measured byte
/// weight (every entry is exactly `BLOCK_SIZE` bytes or the final short block of a source).
pub struct GlobalCache {
    cache: moka::sync::Cache<(Handle, u64), Arc<[u8]>>,
}

impl GlobalCache {
    pub fn new(byte_budget: u64) -> Self {
        let capacity = (byte_budget / BLOCK_SIZE as u64).max(1);
        Self { cache: moka::sync::Cache::new(capacity) }
    }

    /// Builds the cache from `VFS_BLOCK_CACHE_GB` (a non-negative float, gigabytes, default
    /// 1.0). A malformed value is a configuration error the process should not start with.
    pub fn from_env() -> Self {
        Self::new(budget_bytes_from_env())
    }
}

fn budget_bytes_from_env() -> u64 {
    match std::env::var("VFS_BLOCK_CACHE_GB") {
        Err(_) => (DEFAULT_BUDGET_GIB * (1u64 << 30) as f64) as u64,
        Ok(raw) => {
            let gib: f64 = raw
                .trim()
                .parse()
                .unwrap_or_else(|_| panic!("VFS_BLOCK_CACHE_GB must be a number, got {raw:?}"));
            assert!(gib >= 0.0, "VFS_BLOCK_CACHE_GB must be non-negative, got {gib}");
            (gib * (1u64 << 30) as f64) as u64
        }
    }
}

/// Wraps an `Arc<io::Error>` so it can be replayed through `io::Error::new` without cloning the
/// original `io::Error` (which is not `Clone`).
#[derive(Debug)]
struct StickyError(Arc<io::Error>);

impl fmt::Display for StickyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StickyError {}

fn replay(err: &Arc<io::Error>) -> io::Error {
    io::Error::new(err.kind(), StickyError(err.clone()))
}

struct State {
    reader: Option<Box<dyn Read + Send>>,
    /// Index of the next block the live reader will produce.
    next_block: u64,
    /// Once the factory or reader errors, every block at or past this index replays the same
    /// error instead of re-invoking the factory (§4.3).
    pinned: Option<(u64, Arc<io::Error>)>,
}

/// Adapts one [`SequentialFactory`] into random access, single-flighted behind a mutex so
/// concurrent readers of the same entry advance one shared producer instead of racing factories.
pub struct BlockCacheAdapter {
    handle: Handle,
    cache: Arc<GlobalCache>,
    factory: Arc<dyn SequentialFactory>,
    state: Mutex<State>,
}

impl BlockCacheAdapter {
    pub fn new(handle: Handle, cache: Arc<GlobalCache>, factory: Arc<dyn SequentialFactory>) -> Self {
        Self { handle, cache, factory, state: Mutex::new(State { reader: None, next_block: 0, pinned: None }) }
    }

    /// Fills `buf` completely from `offset`, spanning as many blocks as needed, unless an error
    /// or end-of-stream intervenes partway through (§4.3, §8: "read exactly `len(buf)` bytes
    /// unless an error or EOF intervenes").
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let mut filled = 0usize;
        while filled < buf.len() {
            let pos = offset + filled as u64;
            let block_index = pos / BLOCK_SIZE as u64;
            let within = (pos % BLOCK_SIZE as u64) as usize;

            let block = match self.block_at(block_index) {
                Ok(block) => block,
                Err(e) => return if filled > 0 { Ok(filled) } else { Err(e) },
            };
            if within >= block.len() {
                // End of stream: this block is short (or empty) and does not reach `within`.
                break;
            }
            let n = std::cmp::min(buf.len() - filled, block.len() - within);
            buf[filled..filled + n].copy_from_slice(&block[within..within + n]);
            filled += n;
            if block.len() < BLOCK_SIZE {
                // Final (short) block of the stream; nothing beyond it to read.
                break;
            }
        }
        Ok(filled)
    }

    fn block_at(&self, index: u64) -> io::Result<Arc<[u8]>> {
        if let Some(block) = self.cache.cache.get(&(self.handle, index)) {
            return Ok(block);
        }

        let mut state = self.state.lock();
        if let Some(block) = self.cache.cache.get(&(self.handle, index)) {
            return Ok(block);
        }
        if let Some((pinned_at, err)) = &state.pinned {
            if index >= *pinned_at {
                return Err(replay(err));
            }
        }

        // The block we want has already scrolled past the live reader's position (evicted, or
        // never visited on this reader's current pass): reopen from scratch.
        if index < state.next_block {
            tracing::debug!(handle = ?self.handle, wanted = index, at = state.next_block, "reopening sequential reader");
            state.reader = None;
            state.next_block = 0;
        }

        loop {
            if state.reader.is_none() {
                match self.factory.open() {
                    Ok(r) => state.reader = Some(r),
                    Err(e) => {
                        let err = Arc::new(e);
                        let at = state.next_block;
                        tracing::warn!(handle = ?self.handle, block = at, error = %err, "sequential factory open failed");
                        state.pinned = Some((at, err.clone()));
                        return Err(replay(&err));
                    }
                }
            }

            let mut buf = vec![0u8; BLOCK_SIZE];
            let read_result = {
                let reader = state.reader.as_mut().expect("reader set above");
                read_fill(reader.as_mut(), &mut buf)
            };

            let produced_index = state.next_block;
            match read_result {
                Ok(0) => {
                    let empty: Arc<[u8]> = Arc::from(Vec::new().into_boxed_slice());
                    self.cache.cache.insert((self.handle, produced_index), empty.clone());
                    return Ok(empty);
                }
                Ok(n) => {
                    buf.truncate(n);
                    let block: Arc<[u8]> = Arc::from(buf.into_boxed_slice());
                    self.cache.cache.insert((self.handle, produced_index), block.clone());
                    state.next_block += 1;
                    if produced_index == index {
                        return Ok(block);
                    }
                    if n < BLOCK_SIZE {
                        // Short read: end of stream reached before the requested block exists.
                        let empty: Arc<[u8]> = Arc::from(Vec::new().into_boxed_slice());
                        return Ok(empty);
                    }
                }
                Err(e) => {
                    let err = Arc::new(e);
                    tracing::warn!(handle = ?self.handle, block = produced_index, error = %err, "sequential reader failed, pinning error");
                    state.pinned = Some((produced_index, err.clone()));
                    return Err(replay(&err));
                }
            }
        }
    }
}

/// `Read::read` may return short of a full buffer even mid-stream; fill `buf` completely unless
/// the stream is actually exhausted.
fn read_fill(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
