//! Narrowphase: exact collision tests and manifold construction
//!
//! Each candidate pair from the broadphase is routed through a 5×5 table
//! indexed by shape kind. Shapes are first put in canonical order (lower
//! kind first, and for two shapes of the same kind the one with the smaller
//! pose), so the result for (A, B) is always the exact negation of (B, A).

mod clip;
mod sat;

pub use clip::{clip_polygon, generate_contacts, ClippedContact, ClippedContacts, CONTACT_TOLERANCE};
pub use sat::{
    capsule_capsule, capsule_polyhedron, capsule_sphere, polyhedron_capsule,
    polyhedron_polyhedron, polyhedron_sphere, sphere_capsule, sphere_polyhedron, sphere_sphere,
    CollisionData, CollisionFn, DispatchTable, DEFAULT_DISPATCH,
};

use std::cmp::Ordering;

use parking_lot::Mutex;

use crate::body::{BodyHandle, RigidBody};
use crate::error::{PhysicsError, Result};
use crate::manifold::{Manifold, ManifoldSink};
use crate::shape::{ShapeKind, WorldShape};

/// Total order on world poses used to break same-kind ties
fn pose_order(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Ordering {
    let (pa, pb) = (a.transform.position, b.transform.position);
    let (ra, rb) = (a.transform.rotation, b.transform.rotation);
    pa.x.total_cmp(&pb.x)
        .then(pa.y.total_cmp(&pb.y))
        .then(pa.z.total_cmp(&pb.z))
        .then(ra.x.total_cmp(&rb.x))
        .then(ra.y.total_cmp(&rb.y))
        .then(ra.z.total_cmp(&rb.z))
        .then(ra.w.total_cmp(&rb.w))
}

/// Test two shapes through a dispatch table.
///
/// `Ok(None)` means no collision; a missing table entry is an error.
pub fn try_check_collision(
    table: &DispatchTable,
    a: &WorldShape<'_>,
    b: &WorldShape<'_>,
) -> Result<Option<CollisionData>> {
    let (ka, kb) = (a.kind(), b.kind());
    let swap = match ka.cmp(&kb) {
        Ordering::Greater => true,
        Ordering::Equal => pose_order(a, b) == Ordering::Greater,
        Ordering::Less => false,
    };
    let (first, second) = if swap { (b, a) } else { (a, b) };

    let routine = table[first.kind().index()][second.kind().index()]
        .ok_or(PhysicsError::UnsupportedShapePair(ka, kb))?;
    Ok(routine(first, second).map(|data| if swap { data.flipped() } else { data }))
}

/// Test two shapes with the built-in routines, which cover every kind pair
pub fn check_collision(a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
    try_check_collision(&DEFAULT_DISPATCH, a, b).ok().flatten()
}

/// Outcome of processing one candidate pair
#[derive(Debug, Clone, Copy)]
pub struct PairContact {
    pub data: CollisionData,
    /// Index into this step's manifolds, when one was stored
    pub manifold: Option<usize>,
    /// A collision callback rejected the response
    pub vetoed: bool,
}

/// Narrowphase stage state: the dispatch table and the manifold sink
pub struct Narrowphase {
    table: DispatchTable,
    sink: ManifoldSink,
    /// Pairs skipped this step for lack of a table entry
    unsupported: Mutex<usize>,
}

impl Narrowphase {
    pub fn new(max_manifolds: usize) -> Self {
        Self {
            table: DEFAULT_DISPATCH,
            sink: ManifoldSink::new(max_manifolds),
            unsupported: Mutex::new(0),
        }
    }

    /// Replace or clear the routine for one ordered kind pair
    pub fn set_routine(&mut self, a: ShapeKind, b: ShapeKind, routine: Option<CollisionFn>) {
        self.table[a.index()][b.index()] = routine;
    }

    pub fn routine(&self, a: ShapeKind, b: ShapeKind) -> Option<CollisionFn> {
        self.table[a.index()][b.index()]
    }

    /// Test two shapes; unsupported pairs report no collision.
    ///
    /// The first unsupported pair of a step is logged, the rest only counted.
    pub fn check_collision(&self, a: &WorldShape<'_>, b: &WorldShape<'_>) -> Option<CollisionData> {
        match try_check_collision(&self.table, a, b) {
            Ok(hit) => hit,
            Err(e) => {
                let mut unsupported = self.unsupported.lock();
                if *unsupported == 0 {
                    log::error!("{}; further unsupported pairs this step are not logged", e);
                }
                *unsupported += 1;
                None
            }
        }
    }

    /// Pairs skipped this step because the table has no routine for them
    pub fn unsupported_pairs(&self) -> usize {
        *self.unsupported.lock()
    }

    /// Run the exact test for one pair, consult both collision callbacks and
    /// store a manifold unless one of them vetoed.
    ///
    /// A's callback sees `(a, b)` and B's sees `(b, a)`; both always run.
    pub fn process_pair(
        &self,
        handle_a: BodyHandle,
        a: &RigidBody,
        handle_b: BodyHandle,
        b: &RigidBody,
    ) -> Option<PairContact> {
        let shape_a = a.world_shape();
        let shape_b = b.world_shape();
        let data = self.check_collision(&shape_a, &shape_b)?;

        let allow_a = a.collision_callback().map_or(true, |cb| cb(handle_a, handle_b));
        let allow_b = b.collision_callback().map_or(true, |cb| cb(handle_b, handle_a));
        if !(allow_a && allow_b) {
            log::trace!("Collision {:?} / {:?} vetoed by callback", handle_a, handle_b);
            return Some(PairContact {
                data,
                manifold: None,
                vetoed: true,
            });
        }

        let contacts = generate_contacts(&shape_a, &shape_b, &data);
        let manifold = Manifold::from_contacts(handle_a, a, handle_b, b, data.normal, &contacts);
        Some(PairContact {
            data,
            manifold: self.sink.push(manifold),
            vetoed: false,
        })
    }

    pub fn manifolds(&self) -> &ManifoldSink {
        &self.sink
    }

    pub fn manifolds_mut(&mut self) -> &mut ManifoldSink {
        &mut self.sink
    }

    /// Start a new step
    pub fn reset(&mut self) {
        self.sink.reset();
        *self.unsupported.get_mut() = 0;
    }
}
