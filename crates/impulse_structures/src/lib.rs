//! # impulse_structures - Body storage
//!
//! - SlotArena: fixed-capacity generational storage with a free-index stack

pub mod slot_arena;

pub use slot_arena::{SlotArena, SlotKey};

pub mod prelude {
    pub use crate::slot_arena::{SlotArena, SlotKey};
}
