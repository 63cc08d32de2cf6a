//! Append-only storage addressed by stable integer handles.
//!
//! Signals, fragments and clock domains all live in an [`Arena`]. Cross
//! references between them are stored as IDs, never as pointers, so a design
//! can be cloned, flattened or serialized without aliasing concerns.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// A dense, ID-indexed container.
///
/// Items are only ever appended, so every ID handed out stays valid for the
/// lifetime of the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Appends an item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = self.next_id();
        self.items.push(item);
        id
    }

    /// Returns the ID the next [`alloc`](Self::alloc) will hand out.
    pub fn next_id(&self) -> I {
        I::from_raw(self.items.len() as u32)
    }

    /// Returns the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID was not allocated by this arena.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }

    /// Returns the item with the given ID, or `None` if it is out of range.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Returns the item with the given ID mutably.
    ///
    /// # Panics
    ///
    /// Panics if the ID was not allocated by this arena.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over every allocated ID in order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }

    /// Iterates over the items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn alloc_and_index() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        let a = arena.alloc("clk");
        let b = arena.alloc("rst");
        assert_eq!(arena[a], "clk");
        assert_eq!(arena[b], "rst");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn next_id_predicts_alloc() {
        let mut arena: Arena<SignalId, u8> = Arena::new();
        let predicted = arena.next_id();
        assert_eq!(arena.alloc(1), predicted);
    }

    #[test]
    fn try_get_out_of_range() {
        let arena: Arena<SignalId, u8> = Arena::default();
        assert!(arena.is_empty());
        assert!(arena.try_get(SignalId::from_raw(0)).is_none());
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        let id = arena.alloc(1);
        arena[id] += 41;
        assert_eq!(arena[id], 42);
    }

    #[test]
    fn ids_and_iter_agree() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        arena.alloc(10);
        arena.alloc(20);
        let from_iter: Vec<_> = arena.iter().map(|(id, _)| id).collect();
        let from_ids: Vec<_> = arena.ids().collect();
        assert_eq!(from_iter, from_ids);
        assert_eq!(arena.values().copied().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn serde_roundtrip() {
        let mut arena: Arena<SignalId, String> = Arena::new();
        arena.alloc("first".to_string());
        arena.alloc("second".to_string());
        let json = serde_json::to_string(&arena).unwrap();
        let restored: Arena<SignalId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored[SignalId::from_raw(1)], "second");
    }
}
