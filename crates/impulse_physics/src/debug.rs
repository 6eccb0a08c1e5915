//! Debug visualisation data
//!
//! The core draws nothing itself. A snapshot collects the geometry a
//! renderer would need for the categories selected in [`DebugDrawFlags`].

use impulse_math::{Vec3, AABB};
use impulse_structures::SlotArena;

use crate::body::{BodyHandle, RigidBody};
use crate::manifold::Manifold;

/// Bit set selecting what a snapshot captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DebugDrawFlags(pub u32);

impl DebugDrawFlags {
    pub const NONE: Self = Self(0);
    /// World bounds of every body
    pub const AABBS: Self = Self(1 << 0);
    /// Contact points from the last step
    pub const CONTACTS: Self = Self(1 << 1);
    /// Contact normals from the last step
    pub const NORMALS: Self = Self(1 << 2);
    /// Broadphase partition bounds
    pub const PARTITIONS: Self = Self(1 << 3);
    /// Resting bodies only, drawn dimmed by renderers
    pub const RESTING: Self = Self(1 << 4);
    pub const ALL: Self = Self(0x1f);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for DebugDrawFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One body's bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugBounds {
    pub body: BodyHandle,
    pub aabb: AABB,
    pub at_rest: bool,
    pub is_static: bool,
}

/// One contact from the last step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugContact {
    pub point: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
}

/// Geometry for one debug frame
#[derive(Debug, Clone, Default)]
pub struct DebugSnapshot {
    pub flags: DebugDrawFlags,
    pub bounds: Vec<DebugBounds>,
    pub contacts: Vec<DebugContact>,
    pub partitions: Vec<AABB>,
}

impl DebugSnapshot {
    pub(crate) fn capture(
        flags: DebugDrawFlags,
        bodies: &SlotArena<RigidBody>,
        manifolds: &[Manifold],
        partitions: &[AABB],
    ) -> Self {
        let mut snapshot = Self {
            flags,
            ..Default::default()
        };

        if flags.contains(DebugDrawFlags::AABBS) || flags.contains(DebugDrawFlags::RESTING) {
            let resting_only = !flags.contains(DebugDrawFlags::AABBS);
            snapshot.bounds = bodies
                .iter()
                .filter(|(_, body)| !resting_only || body.is_at_rest())
                .map(|(key, body)| DebugBounds {
                    body: BodyHandle(key),
                    aabb: body.aabb(),
                    at_rest: body.is_at_rest(),
                    is_static: body.is_static(),
                })
                .collect();
        }

        if flags.contains(DebugDrawFlags::CONTACTS) || flags.contains(DebugDrawFlags::NORMALS) {
            snapshot.contacts = manifolds
                .iter()
                .flat_map(|m| m.contacts.iter())
                .map(|c| DebugContact {
                    point: c.point,
                    normal: c.normal,
                    penetration: c.penetration,
                })
                .collect();
        }

        if flags.contains(DebugDrawFlags::PARTITIONS) {
            snapshot.partitions = partitions.to_vec();
        }

        snapshot
    }

    /// Line segments for contact normals, `length` long
    pub fn normal_lines(&self, length: f32) -> Vec<(Vec3, Vec3)> {
        if !self.flags.contains(DebugDrawFlags::NORMALS) {
            return Vec::new();
        }
        self.contacts
            .iter()
            .map(|c| (c.point, c.point + c.normal * length))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty() && self.contacts.is_empty() && self.partitions.is_empty()
    }
}
