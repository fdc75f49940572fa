//! Open-addressed hash table mapping `hash(parent, basename)` to an existing [`super::Handle`].
//!
//! Collisions are resolved by the caller re-checking the candidate's actual `(parent, basename)`
//! against the arena (see [`super::Interner::intern_under`]); this table only narrows the search.

use super::Handle;

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Occupied { hash: u64, handle: Handle },
}

pub struct Table {
    slots: Vec<Slot>,
    len: usize,
}

const INITIAL_CAPACITY: usize = 64;
/// Grow once occupancy crosses ~81% load, per §4.1.
const LOAD_FACTOR_NUM: usize = 81;
const LOAD_FACTOR_DEN: usize = 100;

impl Table {
    pub fn new() -> Self {
        Self { slots: vec![Slot::Empty; INITIAL_CAPACITY], len: 0 }
    }

    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    /// Returns the existing handle for `hash`, probing linearly and letting `matches` confirm
    /// real equality (hash collisions are possible and must be resolved against the arena).
    pub fn find(&self, hash: u64, mut matches: impl FnMut(Handle) -> bool) -> Option<Handle> {
        let mask = self.mask();
        let mut idx = (hash as usize) & mask;
        loop {
            match self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied { hash: h, handle } if h == hash && matches(handle) => {
                    return Some(handle)
                }
                _ => idx = (idx + 1) & mask,
            }
        }
    }

    /// Inserts `(hash, handle)`, growing first if the load factor would be exceeded. Caller must
    /// have already confirmed via [`Table::find`] that no equal entry exists.
    pub fn insert(&mut self, hash: u64, handle: Handle) {
        if (self.len + 1) * LOAD_FACTOR_DEN > self.slots.len() * LOAD_FACTOR_NUM {
            self.grow();
        }
        let mask = self.mask();
        let mut idx = (hash as usize) & mask;
        loop {
            match self.slots[idx] {
                Slot::Empty => {
                    self.slots[idx] = Slot::Occupied { hash, handle };
                    self.len += 1;
                    return;
                }
                _ => idx = (idx + 1) & mask,
            }
        }
    }

    fn grow(&mut self) {
        let new_cap = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_cap]);
        self.len = 0;
        for slot in old {
            if let Slot::Occupied { hash, handle } = slot {
                self.insert_during_rehash(hash, handle);
            }
        }
    }

    /// Like [`Table::insert`] but never triggers a nested growth check (capacity was already
    /// chosen to hold everything being rehashed).
    fn insert_during_rehash(&mut self, hash: u64, handle: Handle) {
        let mask = self.mask();
        let mut idx = (hash as usize) & mask;
        loop {
            match self.slots[idx] {
                Slot::Empty => {
                    self.slots[idx] = Slot::Occupied { hash, handle };
                    self.len += 1;
                    return;
                }
                _ => idx = (idx + 1) & mask,
            }
        }
    }
}

/// FNV-1a over the parent handle and basename bytes. Deterministic and fast, unlike the
/// randomized default hasher `std::collections::HashMap` would otherwise pull in for this
/// hot path (§4.1: "keep critical sections minimal").
pub fn hash_entry(parent: Handle, basename: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut h = OFFSET;
    for byte in parent.0.to_le_bytes() {
        h ^= byte as u64;
        h = h.wrapping_mul(PRIME);
    }
    for &byte in basename {
        h ^= byte as u64;
        h = h.wrapping_mul(PRIME);
    }
    h
}
