//! Contact manifolds
//!
//! A manifold is the per-step contact set between two bodies. It is rebuilt
//! from scratch every step; the accumulated impulses on each point only live
//! for the solver iterations of that step.

use impulse_math::Vec3;
use impulse_memory::{Arena, FrameStorage};
use parking_lot::{Mutex, MutexGuard};

use crate::body::{BodyHandle, RigidBody};
use crate::events::ContactData;
use crate::narrowphase::ClippedContact;

/// Contacts kept per manifold
pub const MAX_CONTACTS: usize = 8;

/// Contacts closer than this are merged
pub const CONTACT_MERGE_DISTANCE: f32 = 0.02;

/// Approach speeds below this get no restitution
pub const RESTITUTION_VELOCITY_THRESHOLD: f32 = 0.5;

/// One contact point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactPoint {
    /// World position
    pub point: Vec3,
    /// Offset from A's center of mass
    pub offset_a: Vec3,
    /// Offset from B's center of mass
    pub offset_b: Vec3,
    /// Unit normal from A to B
    pub normal: Vec3,
    /// Signed depth, `<= 0` when overlapping
    pub penetration: f32,
    /// Accumulated normal impulse this step, always `<= 0`
    pub sum_impulse_normal: f32,
    /// Accumulated friction impulse this step
    pub sum_impulse_friction: Vec3,
    /// Target separation speed from restitution
    pub restitution_bias: f32,
}

impl From<&ContactPoint> for ContactData {
    fn from(contact: &ContactPoint) -> Self {
        Self {
            point: contact.point,
            normal: contact.normal,
            depth: contact.penetration,
            impulse: contact.sum_impulse_normal,
        }
    }
}

pub type ContactSet = heapless::Vec<ContactPoint, MAX_CONTACTS>;

/// Contacts between one body pair for one step
#[derive(Debug, Clone)]
pub struct Manifold {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub contacts: ContactSet,
    /// Combined friction coefficient
    pub friction: f32,
    /// Combined restitution
    pub elasticity: f32,
}

impl Manifold {
    /// Empty manifold with materials combined from both bodies
    pub fn new(handle_a: BodyHandle, a: &RigidBody, handle_b: BodyHandle, b: &RigidBody) -> Self {
        let mixed = a.material().mix(b.material());
        Self {
            body_a: handle_a,
            body_b: handle_b,
            contacts: ContactSet::new(),
            friction: mixed.friction,
            elasticity: mixed.elasticity,
        }
    }

    /// Manifold holding every clipped contact along `normal`
    pub fn from_contacts<'c>(
        handle_a: BodyHandle,
        a: &RigidBody,
        handle_b: BodyHandle,
        b: &RigidBody,
        normal: Vec3,
        contacts: impl IntoIterator<Item = &'c ClippedContact>,
    ) -> Self {
        let mut manifold = Self::new(handle_a, a, handle_b, b);
        for contact in contacts {
            manifold.add_contact(ContactPoint {
                point: contact.point,
                offset_a: contact.point - a.position(),
                offset_b: contact.point - b.position(),
                normal,
                penetration: contact.penetration,
                ..Default::default()
            });
        }
        manifold
    }

    /// Insert a contact.
    ///
    /// A contact near an existing one replaces it only if deeper. When the
    /// set is full the new contact evicts the shallowest one if it is deeper.
    pub fn add_contact(&mut self, contact: ContactPoint) {
        let merge_sq = CONTACT_MERGE_DISTANCE * CONTACT_MERGE_DISTANCE;
        if let Some(i) = self
            .contacts
            .iter()
            .position(|c| (c.point - contact.point).length_squared() < merge_sq)
        {
            if contact.penetration < self.contacts[i].penetration {
                self.contacts[i] = contact;
            }
            return;
        }

        let Err(contact) = self.contacts.push(contact) else {
            return;
        };

        let shallowest = self
            .contacts
            .iter()
            .enumerate()
            .max_by(|(_, x), (_, y)| x.penetration.total_cmp(&y.penetration))
            .map(|(i, c)| (i, c.penetration));
        if let Some((i, penetration)) = shallowest {
            if contact.penetration < penetration {
                self.contacts[i] = contact;
            }
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Deepest (most negative) penetration in the set
    pub fn deepest_penetration(&self) -> f32 {
        self.contacts
            .iter()
            .map(|c| c.penetration)
            .fold(0.0, f32::min)
    }

    /// Sum of accumulated normal impulses
    pub fn total_normal_impulse(&self) -> f32 {
        self.contacts.iter().map(|c| c.sum_impulse_normal).sum()
    }
}

/// Per-step manifold storage shared by the narrowphase.
///
/// Pair processing only needs `&self`; a full sink drops further manifolds
/// with a warning.
pub struct ManifoldSink {
    manifolds: Mutex<Arena<Manifold>>,
    dropped: Mutex<usize>,
}

impl ManifoldSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            manifolds: Mutex::new(Arena::new(capacity)),
            dropped: Mutex::new(0),
        }
    }

    /// Store a manifold, returning its index for this step
    pub fn push(&self, manifold: Manifold) -> Option<usize> {
        let mut manifolds = self.manifolds.lock();
        let index = manifolds.alloc(manifold);
        if index.is_none() {
            let mut dropped = self.dropped.lock();
            if *dropped == 0 {
                log::warn!(
                    "Manifold capacity {} reached, dropping contacts for the rest of the step",
                    manifolds.capacity()
                );
            }
            *dropped += 1;
        }
        index
    }

    /// Forget last step's manifolds
    pub fn reset(&mut self) {
        self.manifolds.get_mut().reset();
        *self.dropped.get_mut() = 0;
    }

    pub fn lock(&self) -> MutexGuard<'_, Arena<Manifold>> {
        self.manifolds.lock()
    }

    /// Direct access when the sink is exclusively borrowed
    pub fn get_mut(&mut self) -> &mut Arena<Manifold> {
        self.manifolds.get_mut()
    }

    pub fn len(&self) -> usize {
        self.manifolds.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Manifolds dropped this step for lack of capacity
    pub fn dropped(&self) -> usize {
        *self.dropped.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyDesc;
    use crate::shape::CollisionShape;
    use impulse_structures::SlotKey;
    use std::sync::Arc;

    fn pair() -> (RigidBody, RigidBody) {
        let shape = Arc::new(CollisionShape::sphere(1.0).unwrap());
        let a = RigidBody::from_desc(RigidBodyDesc::dynamic(shape.clone()), 0.05, 1);
        let b = RigidBody::from_desc(RigidBodyDesc::dynamic(shape), 0.05, 2);
        (a, b)
    }

    fn handle(i: u32) -> BodyHandle {
        BodyHandle::from_raw(SlotKey::new(i, 0))
    }

    fn contact(x: f32, penetration: f32) -> ContactPoint {
        ContactPoint {
            point: Vec3::new(x, 0.0, 0.0),
            normal: Vec3::Y,
            penetration,
            ..Default::default()
        }
    }

    #[test]
    fn test_nearby_contact_replaced_only_when_deeper() {
        let (a, b) = pair();
        let mut m = Manifold::new(handle(0), &a, handle(1), &b);
        m.add_contact(contact(0.0, -0.1));
        m.add_contact(contact(0.005, -0.05));
        assert_eq!(m.contact_count(), 1);
        assert_eq!(m.contacts[0].penetration, -0.1);

        m.add_contact(contact(0.005, -0.2));
        assert_eq!(m.contact_count(), 1);
        assert_eq!(m.contacts[0].penetration, -0.2);
    }

    #[test]
    fn test_full_manifold_evicts_shallowest() {
        let (a, b) = pair();
        let mut m = Manifold::new(handle(0), &a, handle(1), &b);
        for i in 0..MAX_CONTACTS {
            m.add_contact(contact(i as f32, -0.01 * (i + 1) as f32));
        }
        assert_eq!(m.contact_count(), MAX_CONTACTS);

        m.add_contact(contact(100.0, -0.5));
        assert_eq!(m.contact_count(), MAX_CONTACTS);
        assert!(m.contacts.iter().all(|c| c.penetration != -0.01));
        assert_eq!(m.deepest_penetration(), -0.5);

        m.add_contact(contact(200.0, 0.0));
        assert!(m.contacts.iter().all(|c| c.point.x != 200.0));
    }

    #[test]
    fn test_sink_drops_when_full() {
        let (a, b) = pair();
        let mut sink = ManifoldSink::new(1);
        let m = Manifold::new(handle(0), &a, handle(1), &b);
        assert_eq!(sink.push(m.clone()), Some(0));
        assert_eq!(sink.push(m), None);
        assert_eq!(sink.dropped(), 1);

        sink.reset();
        assert!(sink.is_empty());
        assert_eq!(sink.dropped(), 0);
    }
}
