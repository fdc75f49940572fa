//! `stat`/`lstat` rendering (§4.2): for directories this blocks on "implicit-directory
//! observation" until the entry is upgraded or the whole VFS seals.

use std::sync::atomic::Ordering;

use crate::error::VfsResult;

use super::entry::{DirNode, SYNTHETIC_DIR_MODE};
use super::{FileKind, Resolved, Stat, Vfs};

impl Vfs {
    pub(crate) async fn stat_resolved(&self, path: &str, resolved: &Resolved) -> VfsResult<Stat> {
        let _ = path;
        match resolved {
            Resolved::Dir(d, _) => {
                let (mode, mtime) = self.stable_dir_meta(d).await;
                Ok(Stat { kind: FileKind::Dir, mode, mtime, size: Some(0) })
            }
            Resolved::File(f, _) => {
                let size = *f.size.lock().await;
                Ok(Stat { kind: FileKind::File, mode: f.mode, mtime: f.mtime, size })
            }
            Resolved::Symlink(s, _) => {
                let target_len = self.interner.to_string(s.target).len() as u64;
                Ok(Stat { kind: FileKind::Symlink, mode: s.mode, mtime: s.mtime, size: Some(target_len) })
            }
        }
    }

    /// Blocks until `dir` leaves the `Implicit` state (explicit declaration or seal), or the
    /// whole VFS seals globally, in which case a synthetic mode/mtime is returned (§3, §4.2).
    pub(crate) async fn stable_dir_meta(&self, dir: &std::sync::Arc<DirNode>) -> (u32, i64) {
        loop {
            let local = dir.notify.notified();
            let global = self.global_notify.notified();
            tokio::pin!(local);
            tokio::pin!(global);

            {
                let state = dir.state.lock().await;
                if let Some(meta) = &state.meta {
                    return (meta.mode, meta.mtime);
                }
                if self.sealed_all.load(Ordering::Acquire) {
                    return (SYNTHETIC_DIR_MODE, 0);
                }
            }

            tokio::select! {
                _ = &mut local => {}
                _ = &mut global => {}
            }
        }
    }
}
