//! Broadphase: cheap candidate-pair generation
//!
//! Every implementation consumes the per-step proxy list and appends
//! candidate pairs to a bump arena. They share one pair filter:
//!
//! - both static: skipped
//! - both dynamic and at rest: skipped (static + at-rest is kept, a moving
//!   body may still push the resting one into the static one)
//! - rejected by the collision-group filter: skipped
//! - anything else is emitted once, canonically ordered by slot index

mod brute_force;
mod octree;
mod sort_and_sweep;

pub use brute_force::BruteForceBroadphase;
pub use octree::OctreeBroadphase;
pub use sort_and_sweep::SortAndSweepBroadphase;

use std::collections::HashSet;

use impulse_math::AABB;
use impulse_memory::Arena;
use serde::{Deserialize, Serialize};

use crate::body::BodyHandle;
use crate::config::PhysicsConfig;
use crate::layers::CollisionGroups;

/// Broadphase algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BroadphaseKind {
    /// O(n²) scan
    #[default]
    BruteForce,
    /// Recursive cube subdivision; leaves run the pairwise scan
    Octree {
        max_objects_per_node: usize,
        max_depth: u32,
    },
    /// Sort by AABB minimum along the widest axis and sweep
    SortAndSweep,
}

impl BroadphaseKind {
    /// Octree with defaults suited to a few hundred bodies
    pub fn octree() -> Self {
        Self::Octree {
            max_objects_per_node: 8,
            max_depth: 8,
        }
    }
}

/// Snapshot of one body as seen by the broadphase
#[derive(Debug, Clone, Copy)]
pub struct BroadphaseProxy {
    pub handle: BodyHandle,
    pub aabb: AABB,
    pub is_static: bool,
    pub at_rest: bool,
    pub groups: CollisionGroups,
}

/// Candidate pair, `a` holding the lower slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    pub fn new(x: BodyHandle, y: BodyHandle) -> Self {
        if x.index() <= y.index() {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// Order-independent key built from both slot indices
    #[inline]
    pub fn key(&self) -> u64 {
        pair_key(self.a, self.b)
    }
}

#[inline]
fn pair_key(x: BodyHandle, y: BodyHandle) -> u64 {
    let (lo, hi) = if x.index() <= y.index() {
        (x.index(), y.index())
    } else {
        (y.index(), x.index())
    };
    ((lo as u64) << 32) | hi as u64
}

/// Shared pair filter
#[inline]
pub fn should_test_pair(a: &BroadphaseProxy, b: &BroadphaseProxy) -> bool {
    if a.is_static && b.is_static {
        return false;
    }
    if !a.is_static && !b.is_static && a.at_rest && b.at_rest {
        return false;
    }
    a.groups.can_collide(&b.groups)
}

/// Broadphase contract
pub trait Broadphase: Send {
    fn kind(&self) -> BroadphaseKind;

    /// Append every candidate pair for this step to `out`
    fn find_potential_collision_pairs(
        &mut self,
        proxies: &[BroadphaseProxy],
        out: &mut Arena<CollisionPair>,
    );

    /// Partition bounds from the last run, for debug drawing
    fn debug_partitions(&self) -> &[AABB] {
        &[]
    }
}

/// Build the broadphase selected by `kind`
pub fn create_broadphase(kind: BroadphaseKind, config: &PhysicsConfig) -> Box<dyn Broadphase> {
    match kind {
        BroadphaseKind::BruteForce => Box::new(BruteForceBroadphase::new()),
        BroadphaseKind::Octree {
            max_objects_per_node,
            max_depth,
        } => Box::new(OctreeBroadphase::new(
            max_objects_per_node,
            max_depth,
            config.octree_node_capacity,
            config.octree_index_capacity,
        )),
        BroadphaseKind::SortAndSweep => Box::new(SortAndSweepBroadphase::new()),
    }
}

/// Deduplicating writer into the pair arena.
///
/// The hash set keeps its allocation across steps.
#[derive(Debug, Default)]
pub(crate) struct PairSink {
    seen: HashSet<u64>,
    dropped: usize,
}

impl PairSink {
    pub(crate) fn begin(&mut self) {
        self.seen.clear();
        self.dropped = 0;
    }

    /// Filter, dedup and store one pair
    pub(crate) fn offer(
        &mut self,
        a: &BroadphaseProxy,
        b: &BroadphaseProxy,
        out: &mut Arena<CollisionPair>,
    ) {
        if !should_test_pair(a, b) {
            return;
        }
        let key = pair_key(a.handle, b.handle);
        if self.seen.contains(&key) {
            return;
        }
        if out.alloc(CollisionPair::new(a.handle, b.handle)).is_some() {
            self.seen.insert(key);
        } else {
            self.dropped += 1;
        }
    }

    pub(crate) fn finish(&self, name: &str) {
        if self.dropped > 0 {
            log::warn!(
                "{} broadphase: pair capacity reached, dropped {} candidate pairs",
                name,
                self.dropped
            );
        }
    }
}
