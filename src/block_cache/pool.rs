//! Reference-counted share pool for [`super::BlockCacheAdapter`]s, keyed by the identity of the
//! byte source they wrap. Two `open()` calls against the same archive entry share one adapter
//! (and therefore one producer and one set of cached blocks) instead of duplicating work (§4.3).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::BlockCacheAdapter;
use crate::bytesource::SequentialFactory;
use crate::interner::Handle;

#[derive(Default)]
pub struct SharePool {
    entries: Mutex<HashMap<Handle, Weak<BlockCacheAdapter>>>,
}

impl SharePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live adapter for `handle` if one is already cached and has not been dropped,
    /// otherwise builds a fresh one from `factory` and remembers it weakly.
    pub fn get_or_create(
        &self,
        handle: Handle,
        cache: Arc<super::GlobalCache>,
        factory: Arc<dyn SequentialFactory>,
    ) -> Arc<BlockCacheAdapter> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&handle).and_then(Weak::upgrade) {
            return existing;
        }
        let adapter = Arc::new(BlockCacheAdapter::new(handle, cache, factory));
        entries.insert(handle, Arc::downgrade(&adapter));
        adapter
    }

    /// Drops weak entries whose adapter has already been collected. Cheap to call opportunistically.
    pub fn reap(&self) {
        self.entries.lock().retain(|_, weak| weak.strong_count() > 0);
    }
}
