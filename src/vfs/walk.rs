//! `walk(wait_full)` (§4.2, §9): a lazy pull iterator over the whole tree in creation order —
//! parents before children, siblings ordered as in `read_dir`. When `wait_full` is true the
//! walk suspends at each unsealed directory instead of stopping early.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::error::VfsResult;
use crate::interner::Handle;

use super::entry::{DirNode, EntryKind};
use super::{FileKind, Vfs};

struct Frame {
    dir: Arc<DirNode>,
    prefix: String,
    index: usize,
}

/// A pull-based traversal. Call [`Walk::next`] repeatedly until it returns `Ok(None)`.
pub struct Walk<'a> {
    vfs: &'a Vfs,
    wait_full: bool,
    stack: Vec<Frame>,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(vfs: &'a Vfs, wait_full: bool) -> Self {
        Self { vfs, wait_full, stack: vec![Frame { dir: vfs.root.clone(), prefix: String::new(), index: 0 }] }
    }

    pub async fn next(&mut self) -> VfsResult<Option<(String, FileKind)>> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };

            let next_child = self.next_child_of(frame).await;
            match next_child {
                Some((handle, name, kind)) => {
                    let path = if frame.prefix.is_empty() { name.clone() } else { format!("{}/{}", frame.prefix, name) };
                    match kind {
                        EntryKind::Dir(d) => {
                            let file_kind = FileKind::Dir;
                            self.stack.push(Frame { dir: d, prefix: path.clone(), index: 0 });
                            let _ = handle;
                            return Ok(Some((path, file_kind)));
                        }
                        EntryKind::File(_) => return Ok(Some((path, FileKind::File))),
                        EntryKind::Symlink(_) => return Ok(Some((path, FileKind::Symlink))),
                    }
                }
                None => {
                    self.stack.pop();
                    continue;
                }
            }
        }
    }

    /// Returns the next not-yet-visited child of `frame`'s directory, waiting for it to appear
    /// if `wait_full` and the directory is not yet sealed; `None` once the directory is done.
    async fn next_child_of(&self, frame: &mut Frame) -> Option<(Handle, String, EntryKind)> {
        loop {
            let local = frame.dir.notify.notified();
            let global = self.vfs.global_notify.notified();
            tokio::pin!(local);
            tokio::pin!(global);

            {
                let state = frame.dir.state.lock().await;
                let mut snapshot: Vec<_> = state
                    .children
                    .iter()
                    .map(|(h, slot)| (slot.order, slot.seq, *h, slot.kind.clone()))
                    .collect();
                snapshot.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

                if frame.index < snapshot.len() {
                    let (_, _, handle, kind) = snapshot[frame.index].clone();
                    frame.index += 1;
                    let name = self.vfs.interner.basename(handle);
                    return Some((handle, name, kind));
                }

                let sealed = state.lifecycle.is_sealed() || self.vfs.sealed_all.load(Ordering::Acquire);
                if sealed || !self.wait_full {
                    return None;
                }
            }

            tokio::select! {
                _ = &mut local => {}
                _ = &mut global => {}
            }
        }
    }
}

impl Vfs {
    /// Starts a lazy walk of the whole tree in creation order.
    pub fn walk(&self, wait_full: bool) -> Walk<'_> {
        Walk::new(self, wait_full)
    }
}
