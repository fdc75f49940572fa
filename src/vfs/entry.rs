//! Entry kinds (§3): a directory, a regular file, or a symlink, plus the bits of state each
//! carries. Every node owns its interned [`Handle`] so callers can render a path back out of an
//! entry without threading the originating lookup path through every call site.

use std::collections::HashMap;
use std::sync::atomic::AtomicU16;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::bytesource::ByteSource;
use crate::interner::Handle;

/// Opaque, producer-supplied data attached to an entry. The core never inspects it.
pub type Attachment = Arc<dyn std::any::Any + Send + Sync>;

/// The three entry kinds a path can resolve to, cheap to clone (each variant is an `Arc`).
#[derive(Clone)]
pub enum EntryKind {
    Dir(Arc<DirNode>),
    File(Arc<FileNode>),
    Symlink(Arc<SymlinkNode>),
}

/// A child slot inside a directory's children map: the entry itself plus its sibling ordering
/// key (§4.2 — `order` hint, tie-broken by insertion sequence).
pub struct ChildSlot {
    pub kind: EntryKind,
    pub order: i64,
    pub seq: u64,
}

/// Directory lifecycle, exactly the four states of §4.2's table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DirLifecycle {
    Implicit,
    Explicit,
    Sealed,
    SealedImplicit,
}

impl DirLifecycle {
    pub fn is_sealed(self) -> bool {
        matches!(self, DirLifecycle::Sealed | DirLifecycle::SealedImplicit)
    }
}

/// Metadata that only exists once a directory leaves the `Implicit` state, either by explicit
/// declaration or by synthesis at seal time.
#[derive(Clone)]
pub struct DirMeta {
    pub mode: u32,
    pub mtime: i64,
    pub attach: Option<Attachment>,
}

pub struct DirState {
    pub lifecycle: DirLifecycle,
    pub children: HashMap<Handle, ChildSlot>,
    pub meta: Option<DirMeta>,
    pub next_seq: u64,
}

impl DirState {
    pub fn new_implicit() -> Self {
        Self { lifecycle: DirLifecycle::Implicit, children: HashMap::new(), meta: None, next_seq: 0 }
    }
}

pub struct DirNode {
    pub handle: Handle,
    pub state: Mutex<DirState>,
    pub notify: Notify,
    pub bozo: AtomicU16,
}

impl DirNode {
    pub fn new(handle: Handle) -> Self {
        Self { handle, state: Mutex::new(DirState::new_implicit()), notify: Notify::new(), bozo: AtomicU16::new(0) }
    }
}

pub struct FileNode {
    pub handle: Handle,
    pub mode: u32,
    pub mtime: i64,
    pub source: ByteSource,
    /// `None` until fixed by `set_size`; `Some` thereafter, exactly once (§4.2).
    pub size: Mutex<Option<u64>>,
    pub crc32: Option<u32>,
    pub attach: Option<Attachment>,
    pub bozo: AtomicU16,
}

pub struct SymlinkNode {
    pub handle: Handle,
    /// The interned handle of the symlink's target path, re-rooted at the VFS root.
    pub target: Handle,
    pub mode: u32,
    pub mtime: i64,
    pub bozo: AtomicU16,
}

/// Bits ORed into `mode` to mark the entry kind, matching common POSIX `S_IF*` values so callers
/// that happen to expect those constants still see something sensible.
pub const MODE_DIR_BIT: u32 = 0o040000;
pub const MODE_REG_BIT: u32 = 0o100000;
pub const MODE_LNK_BIT: u32 = 0o120000;

/// Mode synthesized for a directory sealed while still implicit (§3).
pub const SYNTHETIC_DIR_MODE: u32 = 0o755 | MODE_DIR_BIT;
