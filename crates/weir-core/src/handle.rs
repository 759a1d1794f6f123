//! Generic slot+generation table keyed by typed handles.
//!
//! Destroyed entries bump their slot generation, so stale handles resolve to
//! `None` instead of aliasing a newer object. Removing twice is a no-op.

use std::fmt;
use std::hash::Hash;

/// A typed key backed by a raw `u64` slot+generation encoding.
pub trait Handle: Copy + Eq + Hash + fmt::Debug {
    /// Wrap a raw encoded handle.
    fn from_raw(raw: u64) -> Self;

    /// The raw encoded handle.
    fn to_raw(self) -> u64;
}

fn encode(slot: u32, generation: u32) -> u64 {
    ((slot as u64) << 32) | (generation as u64)
}

fn decode(raw: u64) -> (u32, u32) {
    ((raw >> 32) as u32, raw as u32)
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    data: Option<T>,
}

/// Owns values of type `T` addressed by handles of type `K`.
///
/// Slots are recycled through a free list. A slot whose generation would
/// wrap back to zero is retired for good.
#[derive(Clone, Debug)]
pub struct HandleTable<K, T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
    _key: std::marker::PhantomData<K>,
}

impl<K: Handle, T> Default for HandleTable<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Handle, T> HandleTable<K, T> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            _key: std::marker::PhantomData,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value and return its handle.
    pub fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(slot_idx) = self.free_list.pop() {
            let slot = &mut self.slots[slot_idx as usize];
            slot.data = Some(value);
            K::from_raw(encode(slot_idx, slot.generation))
        } else {
            let slot_idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                data: Some(value),
            });
            K::from_raw(encode(slot_idx, 0))
        }
    }

    /// Whether `key` refers to a live entry.
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Shared access to the value behind `key`, `None` if stale.
    pub fn get(&self, key: K) -> Option<&T> {
        let (slot_idx, generation) = decode(key.to_raw());
        let slot = self.slots.get(slot_idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.data.as_ref()
    }

    /// Mutable access to the value behind `key`, `None` if stale.
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let (slot_idx, generation) = decode(key.to_raw());
        let slot = self.slots.get_mut(slot_idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.data.as_mut()
    }

    /// Remove and return the value behind `key`.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let (slot_idx, generation) = decode(key.to_raw());
        let slot = self.slots.get_mut(slot_idx as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.data.take()?;
        self.len -= 1;
        slot.generation = slot.generation.wrapping_add(1);
        // A wrapped generation would match handles from epoch 0.
        if slot.generation != 0 {
            self.free_list.push(slot_idx);
        }
        Some(value)
    }
}
