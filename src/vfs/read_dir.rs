//! `read_dir(count)` (§4.2): a cursor over an open directory's children, re-snapshotted and
//! re-sorted by `(order, insertion sequence, basename)` on every call so newly arrived children
//! are picked up without losing the caller's place.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::error::{ErrorKind, VfsError, VfsResult};

use super::entry::DirNode;
use super::{FileKind, Vfs};

pub struct ReadDirBatch {
    pub entries: Vec<(String, FileKind)>,
    pub eof: bool,
}

/// An open directory handle positioned by how many entries have already been returned.
pub struct DirCursor {
    dir: Arc<DirNode>,
    returned: usize,
}

impl DirCursor {
    pub(crate) fn new(dir: Arc<DirNode>) -> Self {
        Self { dir, returned: 0 }
    }

    pub async fn read_dir(&mut self, vfs: &Vfs, count: i64) -> VfsResult<ReadDirBatch> {
        if count <= 0 {
            loop {
                let local = self.dir.notify.notified();
                let global = vfs.global_notify.notified();
                tokio::pin!(local);
                tokio::pin!(global);

                {
                    let state = self.dir.state.lock().await;
                    let sealed = state.lifecycle.is_sealed() || vfs.sealed_all.load(Ordering::Acquire);
                    if sealed {
                        let snapshot = snapshot_sorted(&state, vfs);
                        let rest = snapshot.into_iter().skip(self.returned).collect::<Vec<_>>();
                        self.returned += rest.len();
                        return Ok(ReadDirBatch { entries: rest, eof: false });
                    }
                }

                tokio::select! {
                    _ = &mut local => {}
                    _ = &mut global => {}
                }
            }
        }

        let count = count as usize;
        loop {
            let local = self.dir.notify.notified();
            let global = vfs.global_notify.notified();
            tokio::pin!(local);
            tokio::pin!(global);

            {
                let state = self.dir.state.lock().await;
                let snapshot = snapshot_sorted(&state, vfs);
                let total = snapshot.len();
                let sealed = state.lifecycle.is_sealed() || vfs.sealed_all.load(Ordering::Acquire);

                if self.returned < total {
                    let take = std::cmp::min(count, total - self.returned);
                    let batch: Vec<_> = snapshot[self.returned..self.returned + take].to_vec();
                    self.returned += take;
                    let eof = sealed && self.returned == total;
                    return Ok(ReadDirBatch { entries: batch, eof });
                }
                if sealed {
                    return Ok(ReadDirBatch { entries: Vec::new(), eof: true });
                }
            }

            tokio::select! {
                _ = &mut local => {}
                _ = &mut global => {}
            }
        }
    }
}

fn snapshot_sorted(state: &super::entry::DirState, vfs: &Vfs) -> Vec<(String, FileKind)> {
    let mut entries: Vec<_> = state
        .children
        .iter()
        .map(|(handle, slot)| {
            let name = vfs.interner.basename(*handle);
            let kind = match &slot.kind {
                super::entry::EntryKind::Dir(_) => FileKind::Dir,
                super::entry::EntryKind::File(_) => FileKind::File,
                super::entry::EntryKind::Symlink(_) => FileKind::Symlink,
            };
            (slot.order, slot.seq, name, kind)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    entries.into_iter().map(|(_, _, name, kind)| (name, kind)).collect()
}

impl Vfs {
    /// Validates that `path` names a directory and returns `NOT_EXIST`/`INVALID` otherwise; the
    /// actual cursor is constructed by [`crate::file_handle::File::open`].
    pub(crate) async fn resolve_dir(&self, path: &str) -> VfsResult<Arc<DirNode>> {
        match self.resolve("open", path, true).await? {
            super::Resolved::Dir(d, _) => Ok(d),
            _ => Err(VfsError::new("open", path, ErrorKind::Invalid)),
        }
    }
}
