//! Path resolution (§4.2): component walk, symlink following with loop detection, and the
//! generic "wait for a child to appear or for its directory to seal" suspension point.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::interner::Handle;

use super::entry::{DirNode, EntryKind};
use super::{Resolved, Vfs};

impl Vfs {
    /// Resolves `path` to the entry it names. `follow_last` controls whether a symlink at the
    /// final component is followed (`stat`) or returned as-is (`lstat`). `operation` is the
    /// public call this resolution is happening on behalf of, so failures report it rather than
    /// the generic internal mechanism (§7: every error carries `{operation, path, kind}`).
    pub(crate) async fn resolve(&self, operation: &'static str, path: &str, follow_last: bool) -> VfsResult<Resolved> {
        let mut components: Vec<String> =
            Self::split_path_for(operation, path)?.into_iter().map(String::from).collect();
        let mut visited: HashSet<Handle> = HashSet::new();

        'restart: loop {
            let mut dir = self.root.clone();
            let mut dir_handle = Handle::ROOT;

            if components.is_empty() {
                return Ok(Resolved::Dir(dir, dir_handle));
            }

            let mut i = 0;
            while i < components.len() {
                let is_last = i == components.len() - 1;
                let child_handle = self
                    .interner
                    .intern_under(dir_handle, &components[i])
                    .map_err(|_| VfsError::new(operation, path, ErrorKind::Invalid))?;

                let entry = self.wait_for_child(&dir, child_handle).await.map_err(|mut e| {
                    e.operation = operation;
                    e.path = path.to_string();
                    e
                })?;

                match entry {
                    EntryKind::Dir(d) => {
                        if is_last {
                            return Ok(Resolved::Dir(d, child_handle));
                        }
                        dir = d;
                        dir_handle = child_handle;
                        i += 1;
                    }
                    EntryKind::File(f) => {
                        if is_last {
                            return Ok(Resolved::File(f, child_handle));
                        }
                        return Err(VfsError::new(operation, path, ErrorKind::NotExist));
                    }
                    EntryKind::Symlink(s) => {
                        if is_last && !follow_last {
                            return Ok(Resolved::Symlink(s, child_handle));
                        }
                        if !visited.insert(child_handle) {
                            return Err(VfsError::new(operation, path, ErrorKind::NotExist));
                        }
                        let target_path = self.interner.to_string(s.target);
                        let mut rest: Vec<String> =
                            Self::split_path(&target_path).unwrap_or_default().into_iter().map(String::from).collect();
                        rest.extend(components[i + 1..].iter().cloned());
                        components = rest;
                        continue 'restart;
                    }
                }
            }
            unreachable!("loop exits via an is_last branch or a restart")
        }
    }

    /// Blocks until `child_handle` appears under `dir`, `dir` seals, or the VFS seals globally.
    /// Subscribes to both notify futures *before* checking the predicate, per §9. The returned
    /// error's `operation`/`path` are placeholders the caller (`resolve`) always overwrites.
    pub(crate) async fn wait_for_child(&self, dir: &Arc<DirNode>, child_handle: Handle) -> VfsResult<EntryKind> {
        loop {
            let local = dir.notify.notified();
            let global = self.global_notify.notified();
            tokio::pin!(local);
            tokio::pin!(global);

            {
                let state = dir.state.lock().await;
                if let Some(slot) = state.children.get(&child_handle) {
                    return Ok(slot.kind.clone());
                }
                if state.lifecycle.is_sealed() || self.sealed_all.load(Ordering::Acquire) {
                    return Err(VfsError::new("resolve", "", ErrorKind::NotExist));
                }
            }

            tokio::select! {
                _ = &mut local => {}
                _ = &mut global => {}
            }
        }
    }
}
