//! # impulse_memory - Per-step scratch storage
//!
//! Fixed-capacity bump arenas for data that lives exactly one simulation
//! step: broadphase proxies and pairs, octree nodes, contact manifolds.
//! Arenas are reset at the start of each step rather than freed.

pub mod arena;

pub use arena::{Arena, ArenaState};

/// Common trait for per-step storage
pub trait FrameStorage {
    /// Drop every allocation, keeping the backing buffer
    fn reset(&mut self);

    /// Get the total capacity
    fn capacity(&self) -> usize;

    /// Get the number of slots in use
    fn used(&self) -> usize;

    /// Get the remaining slots
    fn available(&self) -> usize {
        self.capacity().saturating_sub(self.used())
    }
}

pub mod prelude {
    pub use crate::{Arena, ArenaState, FrameStorage};
}
