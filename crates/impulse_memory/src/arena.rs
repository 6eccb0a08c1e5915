//! Arena - typed linear allocation with bulk reset
//!
//! The backing buffer is reserved once at construction. Allocations append to
//! it until capacity is reached; nothing is ever freed individually. A step
//! resets the arena and starts over, so steady-state frames never touch the
//! global allocator.

use core::ops::Range;

use crate::FrameStorage;

/// Bump arena of `T` values with a hard capacity
pub struct Arena<T> {
    items: Vec<T>,
    capacity: usize,
    peak: usize,
}

impl<T> Arena<T> {
    /// Create a new arena with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            peak: 0,
        }
    }

    /// Allocate a single value, returning its index
    pub fn alloc(&mut self, value: T) -> Option<usize> {
        if self.items.len() >= self.capacity {
            return None;
        }
        let index = self.items.len();
        self.items.push(value);
        self.peak = self.peak.max(self.items.len());
        Some(index)
    }

    /// Allocate a contiguous run of values.
    ///
    /// Either every value fits or the arena is left exactly as it was.
    pub fn alloc_extend<I>(&mut self, values: I) -> Option<Range<usize>>
    where
        I: IntoIterator<Item = T>,
    {
        let state = self.save();
        for value in values {
            if self.alloc(value).is_none() {
                self.restore(state);
                return None;
            }
        }
        Some(state.len..self.items.len())
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Every value allocated since the last reset
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Values in a range previously returned by `alloc_extend`
    #[inline]
    pub fn slice(&self, range: Range<usize>) -> &[T] {
        &self.items[range]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Highest number of values held at once since construction
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Save the current state for later restore
    #[inline]
    pub fn save(&self) -> ArenaState {
        ArenaState {
            len: self.items.len(),
        }
    }

    /// Roll back to a previously saved state, dropping everything after it
    pub fn restore(&mut self, state: ArenaState) {
        self.items.truncate(state.len);
    }
}

impl<T> FrameStorage for Arena<T> {
    fn reset(&mut self) {
        self.items.clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn used(&self) -> usize {
        self.items.len()
    }
}

impl<T> core::ops::Index<usize> for Arena<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> core::ops::IndexMut<usize> for Arena<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a Arena<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Saved arena state for rollback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaState {
    len: usize,
}
