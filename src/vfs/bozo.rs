//! The bozo slot (GLOSSARY): a per-entry 16-bit field the core never reads, reserved for
//! whatever a consumer wants to stash against an entry it has already resolved.

use std::sync::atomic::Ordering;

use crate::error::VfsResult;

use super::{Resolved, Vfs};

impl Vfs {
    pub async fn set_bozo(&self, path: &str, value: u16) -> VfsResult<()> {
        let resolved = self.resolve("set_bozo", path, false).await?;
        bozo_of(&resolved).store(value, Ordering::Relaxed);
        Ok(())
    }

    pub async fn get_bozo(&self, path: &str) -> VfsResult<u16> {
        let resolved = self.resolve("get_bozo", path, false).await?;
        Ok(bozo_of(&resolved).load(Ordering::Relaxed))
    }
}

fn bozo_of(resolved: &Resolved) -> &std::sync::atomic::AtomicU16 {
    match resolved {
        Resolved::Dir(d, _) => &d.bozo,
        Resolved::File(f, _) => &f.bozo,
        Resolved::Symlink(s, _) => &s.bozo,
    }
}
