//! Path Interner (§4.1): canonicalizes slash-paths into small, comparable, process-lifetime
//! handles, backed by a single growing byte arena and an open-addressed hash table.

mod arena;
mod table;

use parking_lot::RwLock;

use crate::error::{ErrorKind, VfsError, VfsResult};
use table::Table;

/// A process-lifetime handle denoting a canonical interned path. Two handles are equal iff they
/// denote the same path; `Handle` is `Copy` and fits in a map key the way the spec requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    /// Denotes the path `.`, i.e. the VFS root. Never has a real arena entry.
    pub const ROOT: Handle = Handle(0);
}

/// Maximum length of a single basename, mirroring the teacher's RFC-derived `MAX_NAME_LEN`.
pub const MAX_NAME_LEN: usize = 255;

struct Inner {
    /// Byte 0 is a sentinel pad so that no real entry can ever land at offset 0, which is
    /// reserved for [`Handle::ROOT`].
    arena: Vec<u8>,
    table: Table,
}

/// Shared, content-addressed arena of interned paths. Cheap to clone (wrap in `Arc`); all
/// methods take `&self` and synchronize internally via a single reader-writer lock (§4.1).
pub struct Interner {
    inner: RwLock<Inner>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner { arena: vec![0u8], table: Table::new() }) }
    }

    /// Interns a full slash-path, returning [`Handle::ROOT`] for `"."`. Components must already
    /// be the product of the caller's "valid slash-path" gate: no leading slash, no empty
    /// component, no embedded NUL, and (outside the single-string root sentinel) no `.`/`..`.
    pub fn intern(&self, path: &str) -> VfsResult<Handle> {
        if path == "." {
            return Ok(Handle::ROOT);
        }
        let mut handle = Handle::ROOT;
        for component in path.split('/') {
            validate_component(component)?;
            handle = self.intern_under(handle, component)?;
        }
        Ok(handle)
    }

    /// Joins a single validated component onto `parent`.
    pub fn intern_under(&self, parent: Handle, basename: &str) -> VfsResult<Handle> {
        validate_component(basename)?;
        let hash = table::hash_entry(parent, basename.as_bytes());

        {
            let inner = self.inner.read();
            if let Some(h) = inner.table.find(hash, |cand| self.entry_matches(&inner, cand, parent, basename)) {
                return Ok(h);
            }
        }

        let mut inner = self.inner.write();
        // Re-probe: another writer may have inserted the same entry while we upgraded the lock.
        if let Some(h) = inner.table.find(hash, |cand| self.entry_matches(&inner, cand, parent, basename)) {
            return Ok(h);
        }

        let offset = inner.arena.len() as u64;
        let delta = offset - parent.0 as u64;
        arena::encode(delta, &mut inner.arena);
        arena::encode(basename.len() as u64, &mut inner.arena);
        inner.arena.extend_from_slice(basename.as_bytes());

        let handle = Handle(offset as u32);
        inner.table.insert(hash, handle);
        Ok(handle)
    }

    /// Looks up a full slash-path without inserting; `None` on the first unknown component.
    pub fn try_intern(&self, path: &str) -> Option<Handle> {
        if path == "." {
            return Some(Handle::ROOT);
        }
        let inner = self.inner.read();
        let mut handle = Handle::ROOT;
        for component in path.split('/') {
            if validate_component(component).is_err() {
                return None;
            }
            let hash = table::hash_entry(handle, component.as_bytes());
            handle = inner.table.find(hash, |cand| self.entry_matches(&inner, cand, handle, component))?;
        }
        Some(handle)
    }

    pub fn parent(&self, handle: Handle) -> Handle {
        if handle == Handle::ROOT {
            return Handle::ROOT;
        }
        let inner = self.inner.read();
        let (delta, _) = arena::decode(&inner.arena, handle.0 as usize);
        Handle((handle.0 as u64 - delta) as u32)
    }

    pub fn basename(&self, handle: Handle) -> String {
        if handle == Handle::ROOT {
            return ".".to_string();
        }
        let inner = self.inner.read();
        String::from_utf8(self.basename_bytes(&inner, handle)).expect("interned basenames are valid UTF-8")
    }

    pub fn base_len(&self, handle: Handle) -> usize {
        if handle == Handle::ROOT {
            return 0;
        }
        let inner = self.inner.read();
        let (delta_len, off1) = arena::decode(&inner.arena, handle.0 as usize);
        let _ = delta_len;
        let (len, _) = arena::decode(&inner.arena, handle.0 as usize + off1);
        len as usize
    }

    pub fn is_within(&self, handle: Handle, ancestor: Handle) -> bool {
        if ancestor == Handle::ROOT {
            return true;
        }
        let mut cur = handle;
        loop {
            if cur == ancestor {
                return true;
            }
            if cur == Handle::ROOT {
                return false;
            }
            cur = self.parent(cur);
        }
    }

    /// Renders the full canonical path. Builds tail-to-head and reverses once, sized up front
    /// by summed basename lengths plus separators (§4.1).
    pub fn to_string(&self, handle: Handle) -> String {
        if handle == Handle::ROOT {
            return ".".to_string();
        }
        let inner = self.inner.read();
        let mut pieces: Vec<(usize, usize)> = Vec::new(); // (offset, len) of each basename, tail to head
        let mut total_len = 0usize;
        let mut cur = handle;
        while cur != Handle::ROOT {
            let (delta, off1) = arena::decode(&inner.arena, cur.0 as usize);
            let (len, off2) = arena::decode(&inner.arena, cur.0 as usize + off1);
            let start = cur.0 as usize + off1 + off2;
            pieces.push((start, len as usize));
            total_len += len as usize;
            cur = Handle((cur.0 as u64 - delta) as u32);
        }
        total_len += pieces.len().saturating_sub(1); // '/' separators
        let mut out = String::with_capacity(total_len);
        for (i, (start, len)) in pieces.iter().rev().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(std::str::from_utf8(&inner.arena[*start..*start + *len]).expect("valid utf8"));
        }
        out
    }

    fn basename_bytes(&self, inner: &Inner, handle: Handle) -> Vec<u8> {
        let (_, off1) = arena::decode(&inner.arena, handle.0 as usize);
        let (len, off2) = arena::decode(&inner.arena, handle.0 as usize + off1);
        let start = handle.0 as usize + off1 + off2;
        inner.arena[start..start + len as usize].to_vec()
    }

    fn entry_matches(&self, inner: &Inner, candidate: Handle, parent: Handle, basename: &str) -> bool {
        let (delta, off1) = arena::decode(&inner.arena, candidate.0 as usize);
        let candidate_parent = (candidate.0 as u64 - delta) as u32;
        if candidate_parent != parent.0 {
            return false;
        }
        let (len, off2) = arena::decode(&inner.arena, candidate.0 as usize + off1);
        let start = candidate.0 as usize + off1 + off2;
        &inner.arena[start..start + len as usize] == basename.as_bytes()
    }
}

fn validate_component(component: &str) -> VfsResult<()> {
    if component.is_empty() || component == "." || component == ".." {
        return Err(VfsError::new("intern", component, ErrorKind::Invalid));
    }
    if component.len() > MAX_NAME_LEN {
        return Err(VfsError::new("intern", component, ErrorKind::Invalid));
    }
    if component.as_bytes().contains(&b'/') || component.as_bytes().contains(&0) {
        return Err(VfsError::new("intern", component, ErrorKind::Invalid));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_round_trips() {
        let i = Interner::new();
        let h = i.intern(".").unwrap();
        assert_eq!(h, Handle::ROOT);
        assert_eq!(i.to_string(h), ".");
        assert_eq!(i.parent(h), Handle::ROOT);
    }

    #[test]
    fn same_path_interns_to_the_same_handle() {
        let i = Interner::new();
        let a = i.intern("a/b/c").unwrap();
        let b = i.intern("a/b/c").unwrap();
        assert_eq!(a, b);
        assert_eq!(i.to_string(a), "a/b/c");
    }

    #[test]
    fn distinct_paths_get_distinct_handles() {
        let i = Interner::new();
        let a = i.intern("a/b").unwrap();
        let b = i.intern("a/c").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn intern_under_matches_full_path_intern() {
        let i = Interner::new();
        let a = i.intern("a").unwrap();
        let ab_via_under = i.intern_under(a, "b").unwrap();
        let ab_via_full = i.intern("a/b").unwrap();
        assert_eq!(ab_via_under, ab_via_full);
    }

    #[test]
    fn try_intern_does_not_insert() {
        let i = Interner::new();
        assert!(i.try_intern("a/b").is_none());
        assert!(i.try_intern("a/b").is_none());
        i.intern("a/b").unwrap();
        assert!(i.try_intern("a/b").is_some());
    }

    #[test]
    fn is_within_walks_ancestors() {
        let i = Interner::new();
        let a = i.intern("a").unwrap();
        let ab = i.intern("a/b").unwrap();
        let other = i.intern("x").unwrap();
        assert!(i.is_within(ab, a));
        assert!(i.is_within(ab, Handle::ROOT));
        assert!(!i.is_within(ab, other));
    }

    #[test]
    fn rejects_invalid_components() {
        let i = Interner::new();
        assert!(i.intern("a/./b").is_err());
        assert!(i.intern("a/../b").is_err());
        assert!(i.intern("a//b").is_err());
    }

    #[test]
    fn basename_and_base_len_agree() {
        let i = Interner::new();
        let h = i.intern("alpha/beta").unwrap();
        assert_eq!(i.basename(h), "beta");
        assert_eq!(i.base_len(h), 4);
    }

    #[test]
    fn survives_table_growth() {
        let i = Interner::new();
        let mut handles = Vec::new();
        for n in 0..500 {
            handles.push(i.intern(&format!("dir/file{n}")).unwrap());
        }
        for (n, h) in handles.iter().enumerate() {
            assert_eq!(i.to_string(*h), format!("dir/file{n}"));
        }
    }
}
