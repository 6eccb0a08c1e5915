//! SlotArena - fixed-capacity generational storage
//!
//! Slots are allocated once up to a fixed capacity and never released back to
//! the allocator. Removing a value bumps the slot's generation and pushes the
//! index onto a free stack; the next insert reuses it before growing the
//! high-water mark.

use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Key for slot arena access with generation tracking
pub struct SlotKey<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SlotKey<T> {
    /// Create a new key
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Get the raw index
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Get the generation
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Create a null/invalid key
    #[inline]
    pub const fn null() -> Self {
        Self::new(u32::MAX, 0)
    }

    /// Check if key is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

// Manual impls so keys stay Copy/Eq/Ord whatever T is.
impl<T> Clone for SlotKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlotKey<T> {}

impl<T> PartialEq for SlotKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for SlotKey<T> {}

impl<T> PartialOrd for SlotKey<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for SlotKey<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for SlotKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for SlotKey<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> core::fmt::Debug for SlotKey<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_null() {
            write!(f, "SlotKey(null)")
        } else {
            write!(f, "SlotKey({}v{})", self.index, self.generation)
        }
    }
}

/// Slot entry
struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// Fixed-capacity generational arena
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    capacity: usize,
    len: usize,
}

impl<T> SlotArena<T> {
    /// Create an arena that will never hold more than `capacity` values
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity),
            capacity,
            len: 0,
        }
    }

    /// Insert a value, reusing a freed slot first.
    ///
    /// When every slot is taken the value is handed back in `Err`.
    pub fn try_insert(&mut self, value: T) -> Result<SlotKey<T>, T> {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            self.len += 1;
            return Ok(SlotKey::new(index, slot.generation));
        }

        if self.slots.len() >= self.capacity {
            return Err(value);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            value: Some(value),
            generation: 0,
        });
        self.len += 1;
        Ok(SlotKey::new(index, 0))
    }

    /// Remove a value by key
    pub fn remove(&mut self, key: SlotKey<T>) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;

        if slot.generation != key.generation || slot.value.is_none() {
            return None;
        }

        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(key.index);
        self.len -= 1;

        slot.value.take()
    }

    /// Get a reference to a value
    pub fn get(&self, key: SlotKey<T>) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Get a mutable reference to a value
    pub fn get_mut(&mut self, key: SlotKey<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Mutable references to two distinct live values
    pub fn get2_mut(&mut self, a: SlotKey<T>, b: SlotKey<T>) -> Option<(&mut T, &mut T)> {
        let (ia, ib) = (a.index as usize, b.index as usize);
        if ia == ib || !self.contains_key(a) || !self.contains_key(b) {
            return None;
        }

        let (first, second) = if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };

        Some((first.value.as_mut()?, second.value.as_mut()?))
    }

    /// Check if a key is valid
    pub fn contains_key(&self, key: SlotKey<T>) -> bool {
        self.slots
            .get(key.index as usize)
            .map(|s| s.generation == key.generation && s.value.is_some())
            .unwrap_or(false)
    }

    /// Key of the live value stored at a raw slot index
    pub fn key_at(&self, index: u32) -> Option<SlotKey<T>> {
        let slot = self.slots.get(index as usize)?;
        slot.value.as_ref().map(|_| SlotKey::new(index, slot.generation))
    }

    /// Get the number of live values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if no further insert can succeed
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots ever handed out
    pub fn high_water_mark(&self) -> usize {
        self.slots.len()
    }

    /// Number of freed slots waiting for reuse
    pub fn free_slots(&self) -> usize {
        self.free_list.len()
    }

    /// Remove every value, keeping slots and bumping their generations
    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(i as u32);
            }
        }
        self.len = 0;
    }

    /// Iterate over all live values
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (SlotKey::new(i as u32, slot.generation), v))
        })
    }

    /// Iterate over all live values mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotKey<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let gen = slot.generation;
            slot.value.as_mut().map(|v| (SlotKey::new(i as u32, gen), v))
        })
    }

    /// Iterate over keys only
    pub fn keys(&self) -> impl Iterator<Item = SlotKey<T>> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterate over values only
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    /// Iterate over values mutably
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }
}
