//! Producer surface (§4.2): `create_dir`, `create_file`, `create_symlink`, `set_size`, and the
//! `seal_*` operations. Producers always descend top-down, acquiring at most one directory's
//! mutex at a time, so no lock-order cycle is possible (§5).

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::bytesource::ByteSource;
use crate::error::{ErrorKind, VfsError, VfsResult};
use crate::interner::Handle;

use super::entry::{
    Attachment, ChildSlot, DirLifecycle, DirMeta, DirNode, EntryKind, FileNode, SymlinkNode, MODE_DIR_BIT,
    MODE_LNK_BIT, MODE_REG_BIT, SYNTHETIC_DIR_MODE,
};
use super::Vfs;

impl Vfs {
    pub async fn create_dir(
        &self,
        path: &str,
        mode: u32,
        mtime: i64,
        attach: Option<Attachment>,
    ) -> VfsResult<()> {
        let components = Self::split_path_for("create_dir", path)?;
        if self.sealed_all.load(Ordering::Acquire) {
            return Err(VfsError::new("create_dir", path, ErrorKind::Permission));
        }

        if components.is_empty() {
            return self.declare_dir("create_dir", &self.root, Handle::ROOT, path, mode, mtime, attach).await;
        }

        let (parent, parent_handle) =
            self.ensure_ancestor_dirs("create_dir", path, &components[..components.len() - 1]).await?;
        let name = components[components.len() - 1];
        let child_handle = self
            .interner
            .intern_under(parent_handle, name)
            .map_err(|_| VfsError::new("create_dir", path, ErrorKind::Invalid))?;
        let dir = self.get_or_insert_implicit_dir("create_dir", &parent, path, child_handle).await?;
        self.declare_dir("create_dir", &dir, child_handle, path, mode, mtime, attach).await
    }

    pub async fn create_file(
        &self,
        path: &str,
        order: i64,
        source: ByteSource,
        size: Option<u64>,
        mode: u32,
        mtime: i64,
        crc32: Option<u32>,
        attach: Option<Attachment>,
    ) -> VfsResult<()> {
        let components = Self::split_path_for("create_file", path)?;
        if components.is_empty() {
            // `.` as a file target is rejected: the basename would be empty (§9).
            return Err(VfsError::new("create_file", path, ErrorKind::Invalid));
        }
        if self.sealed_all.load(Ordering::Acquire) {
            return Err(VfsError::new("create_file", path, ErrorKind::Permission));
        }

        let (parent, parent_handle) =
            self.ensure_ancestor_dirs("create_file", path, &components[..components.len() - 1]).await?;
        let name = components[components.len() - 1];
        let child_handle = self
            .interner
            .intern_under(parent_handle, name)
            .map_err(|_| VfsError::new("create_file", path, ErrorKind::Invalid))?;

        let node = Arc::new(FileNode {
            handle: child_handle,
            mode: mode | MODE_REG_BIT,
            mtime,
            source,
            size: tokio::sync::Mutex::new(size),
            crc32,
            attach,
            bozo: std::sync::atomic::AtomicU16::new(0),
        });

        self.insert_new_child("create_file", &parent, path, child_handle, EntryKind::File(node), order).await
    }

    pub async fn create_symlink(
        &self,
        path: &str,
        target: &str,
        mode: u32,
        mtime: i64,
    ) -> VfsResult<()> {
        let components = Self::split_path_for("create_symlink", path)?;
        if components.is_empty() {
            return Err(VfsError::new("create_symlink", path, ErrorKind::Invalid));
        }
        if self.sealed_all.load(Ordering::Acquire) {
            return Err(VfsError::new("create_symlink", path, ErrorKind::Permission));
        }
        let target_handle = self
            .interner
            .intern(target)
            .map_err(|_| VfsError::new("create_symlink", path, ErrorKind::Invalid))?;

        let (parent, parent_handle) =
            self.ensure_ancestor_dirs("create_symlink", path, &components[..components.len() - 1]).await?;
        let name = components[components.len() - 1];
        let child_handle = self
            .interner
            .intern_under(parent_handle, name)
            .map_err(|_| VfsError::new("create_symlink", path, ErrorKind::Invalid))?;

        let node = Arc::new(SymlinkNode {
            handle: child_handle,
            target: target_handle,
            mode: mode | MODE_LNK_BIT,
            mtime,
            bozo: std::sync::atomic::AtomicU16::new(0),
        });

        self.insert_new_child("create_symlink", &parent, path, child_handle, EntryKind::Symlink(node), 0).await
    }

    /// Fixes a file's size exactly once. `INVALID` if the path does not name a file or the size
    /// was already fixed (§9).
    pub async fn set_size(&self, path: &str, size: u64) -> VfsResult<()> {
        let resolved = self.resolve("set_size", path, false).await?;
        match resolved {
            super::Resolved::File(f, _) => {
                let mut slot = f.size.lock().await;
                if slot.is_some() {
                    return Err(VfsError::new("set_size", path, ErrorKind::Invalid));
                }
                *slot = Some(size);
                Ok(())
            }
            _ => Err(VfsError::new("set_size", path, ErrorKind::Invalid)),
        }
    }

    /// Forbids further direct children of `path`; `".."` seals the root as a whole (§4.2).
    pub async fn seal_children(&self, path: &str) -> VfsResult<()> {
        if path == ".." {
            return self.seal_dir(&self.root).await;
        }
        let resolved = self.resolve("seal_children", path, true).await?;
        match resolved {
            super::Resolved::Dir(d, _) => self.seal_dir(&d).await,
            _ => Err(VfsError::new("seal_children", path, ErrorKind::Invalid)),
        }
    }

    async fn seal_dir(&self, dir: &Arc<DirNode>) -> VfsResult<()> {
        let mut state = dir.state.lock().await;
        state.lifecycle = match state.lifecycle {
            DirLifecycle::Sealed | DirLifecycle::SealedImplicit => return Ok(()),
            DirLifecycle::Explicit => DirLifecycle::Sealed,
            DirLifecycle::Implicit => {
                state.meta = Some(DirMeta { mode: SYNTHETIC_DIR_MODE, mtime: 0, attach: None });
                DirLifecycle::SealedImplicit
            }
        };
        drop(state);
        dir.notify.notify_waiters();
        tracing::debug!(handle = ?dir.handle, "directory sealed");
        Ok(())
    }

    async fn declare_dir(
        &self,
        operation: &'static str,
        dir: &Arc<DirNode>,
        handle: Handle,
        path: &str,
        mode: u32,
        mtime: i64,
        attach: Option<Attachment>,
    ) -> VfsResult<()> {
        let mut state = dir.state.lock().await;
        match state.lifecycle {
            DirLifecycle::Implicit => {
                state.lifecycle = DirLifecycle::Explicit;
                state.meta = Some(DirMeta { mode: mode | MODE_DIR_BIT, mtime, attach });
                drop(state);
                dir.notify.notify_waiters();
                let _ = handle;
                Ok(())
            }
            DirLifecycle::Explicit | DirLifecycle::Sealed | DirLifecycle::SealedImplicit => {
                Err(VfsError::new(operation, path, ErrorKind::Exist))
            }
        }
    }

    /// Walks `components`, creating any missing ancestor directories as implicit, and returns
    /// the final ancestor directory (the immediate parent of the last path component). `operation`
    /// is the `create_*` entry point driving this walk, so a failure here reports that call
    /// rather than always blaming `create_dir` (§7).
    async fn ensure_ancestor_dirs<'a>(
        &self,
        operation: &'static str,
        path: &str,
        components: &[&'a str],
    ) -> VfsResult<(Arc<DirNode>, Handle)> {
        let mut dir = self.root.clone();
        let mut dir_handle = Handle::ROOT;
        for comp in components {
            let child_handle = self
                .interner
                .intern_under(dir_handle, comp)
                .map_err(|_| VfsError::new(operation, path, ErrorKind::Invalid))?;
            dir = self.get_or_insert_implicit_dir(operation, &dir, path, child_handle).await?;
            dir_handle = child_handle;
        }
        Ok((dir, dir_handle))
    }

    async fn get_or_insert_implicit_dir(
        &self,
        operation: &'static str,
        parent: &Arc<DirNode>,
        path: &str,
        child_handle: Handle,
    ) -> VfsResult<Arc<DirNode>> {
        let mut state = parent.state.lock().await;
        if state.lifecycle.is_sealed() {
            return Err(VfsError::new(operation, path, ErrorKind::Permission));
        }
        if let Some(slot) = state.children.get(&child_handle) {
            return match &slot.kind {
                EntryKind::Dir(d) => Ok(d.clone()),
                _ => Err(VfsError::new(operation, path, ErrorKind::Exist)),
            };
        }
        let dir = Arc::new(DirNode::new(child_handle));
        let seq = state.next_seq;
        state.next_seq += 1;
        state.children.insert(child_handle, ChildSlot { kind: EntryKind::Dir(dir.clone()), order: 0, seq });
        drop(state);
        parent.notify.notify_waiters();
        Ok(dir)
    }

    async fn insert_new_child(
        &self,
        operation: &'static str,
        parent: &Arc<DirNode>,
        path: &str,
        child_handle: Handle,
        kind: EntryKind,
        order: i64,
    ) -> VfsResult<()> {
        let mut state = parent.state.lock().await;
        if state.lifecycle.is_sealed() {
            return Err(VfsError::new(operation, path, ErrorKind::Permission));
        }
        if state.children.contains_key(&child_handle) {
            return Err(VfsError::new(operation, path, ErrorKind::Exist));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.children.insert(child_handle, ChildSlot { kind, order, seq });
        drop(state);
        parent.notify.notify_waiters();
        Ok(())
    }
}
