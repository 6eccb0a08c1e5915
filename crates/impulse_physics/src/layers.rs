//! Collision layers and group filtering

use serde::{Deserialize, Serialize};

/// A collision layer identifier (bit index into the group masks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionLayer(pub u32);

impl CollisionLayer {
    /// Default layer
    pub const DEFAULT: Self = Self(0);
    /// Static level geometry
    pub const STATIC: Self = Self(1);
    /// Simulated bodies
    pub const DYNAMIC: Self = Self(2);
    /// Detection-only volumes
    pub const TRIGGER: Self = Self(3);
    /// Debris that only collides with static geometry
    pub const DEBRIS: Self = Self(4);

    /// Create a custom layer (0..32)
    pub const fn custom(id: u32) -> Self {
        Self(id)
    }

    /// Get the layer as a bitmask
    pub fn as_mask(&self) -> u32 {
        1u32.checked_shl(self.0).unwrap_or(0)
    }
}

impl Default for CollisionLayer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Membership and filter masks of one body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionGroups {
    /// Which groups this body belongs to
    pub memberships: u32,
    /// Which groups this body can collide with
    pub filter: u32,
}

impl CollisionGroups {
    /// Collides with everything
    pub const ALL: Self = Self {
        memberships: u32::MAX,
        filter: u32::MAX,
    };

    /// Collides with nothing
    pub const NONE: Self = Self {
        memberships: 0,
        filter: 0,
    };

    pub fn new(memberships: u32, filter: u32) -> Self {
        Self { memberships, filter }
    }

    /// Create from a single layer that collides with specific layers
    pub fn from_layer(layer: CollisionLayer, collides_with: &[CollisionLayer]) -> Self {
        let memberships = layer.as_mask();
        let filter = collides_with.iter().fold(0u32, |acc, l| acc | l.as_mask());
        Self { memberships, filter }
    }

    /// Both bodies must accept each other
    pub fn can_collide(&self, other: &CollisionGroups) -> bool {
        (self.memberships & other.filter) != 0 && (other.memberships & self.filter) != 0
    }

    pub fn add_membership(mut self, layer: CollisionLayer) -> Self {
        self.memberships |= layer.as_mask();
        self
    }

    pub fn add_filter(mut self, layer: CollisionLayer) -> Self {
        self.filter |= layer.as_mask();
        self
    }

    pub fn remove_filter(mut self, layer: CollisionLayer) -> Self {
        self.filter &= !layer.as_mask();
        self
    }
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_groups() {
        let debris = CollisionGroups::from_layer(CollisionLayer::DEBRIS, &[CollisionLayer::STATIC]);
        let ground = CollisionGroups::from_layer(
            CollisionLayer::STATIC,
            &[CollisionLayer::DYNAMIC, CollisionLayer::DEBRIS],
        );
        let crate_box = CollisionGroups::from_layer(
            CollisionLayer::DYNAMIC,
            &[CollisionLayer::STATIC, CollisionLayer::DYNAMIC],
        );

        assert!(debris.can_collide(&ground));
        assert!(!debris.can_collide(&crate_box));
        assert!(crate_box.can_collide(&ground));
    }

    #[test]
    fn test_filter_is_symmetric() {
        let a = CollisionGroups::ALL.remove_filter(CollisionLayer::TRIGGER);
        let b = CollisionGroups::from_layer(CollisionLayer::TRIGGER, &[CollisionLayer::DEFAULT]);
        assert_eq!(a.can_collide(&b), b.can_collide(&a));
        assert!(!a.can_collide(&b));
        assert!(CollisionGroups::ALL.can_collide(&CollisionGroups::ALL));
        assert!(!CollisionGroups::NONE.can_collide(&CollisionGroups::ALL));
    }
}
