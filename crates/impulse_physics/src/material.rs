//! Surface materials and the rules for mixing two of them at a contact
//!
//! Every body carries a [`PhysicsMaterial`]. When two bodies touch, their
//! coefficients are mixed once per step into a [`ContactMaterial`] that the
//! manifold hands to the solver. Materials deserialize from partial
//! documents; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

/// How two coefficients mix at a contact.
///
/// Variants are declared in order of precedence: when the two bodies ask
/// for different rules, the later variant wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineRule {
    /// Arithmetic mean
    #[default]
    Average,
    Max,
    /// Square root of the product
    GeometricMean,
    Multiply,
    Min,
}

impl CombineRule {
    /// The rule used when one body asks for `self` and the other for `other`
    #[inline]
    pub fn resolve(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Average => (a + b) * 0.5,
            Self::Max => a.max(b),
            Self::GeometricMean => (a * b).max(0.0).sqrt(),
            Self::Multiply => a * b,
            Self::Min => a.min(b),
        }
    }
}

/// Coefficients of one contact after mixing both materials
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactMaterial {
    /// Coulomb friction coefficient, `>= 0`
    pub friction: f32,
    /// Restitution in `[0, 1]`
    pub elasticity: f32,
}

/// Surface and bulk properties of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsMaterial {
    /// Coulomb friction coefficient (0 = frictionless)
    pub friction: f32,
    /// Elasticity (0 = no bounce, 1 = perfect bounce)
    pub elasticity: f32,
    /// Density used to derive mass from shape volume (kg/m³)
    pub density: f32,
    pub friction_rule: CombineRule,
    pub elasticity_rule: CombineRule,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            elasticity: 0.0,
            density: 1.0,
            friction_rule: CombineRule::Average,
            elasticity_rule: CombineRule::Average,
        }
    }
}

impl PhysicsMaterial {
    pub fn new(friction: f32, elasticity: f32) -> Self {
        Self::default().with_friction(friction).with_elasticity(elasticity)
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity.clamp(0.0, 1.0);
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density.max(0.001);
        self
    }

    pub fn with_friction_rule(mut self, rule: CombineRule) -> Self {
        self.friction_rule = rule;
        self
    }

    pub fn with_elasticity_rule(mut self, rule: CombineRule) -> Self {
        self.elasticity_rule = rule;
        self
    }

    /// Coefficients for a contact between `self` and `other`; symmetric
    pub fn mix(&self, other: &Self) -> ContactMaterial {
        let friction = self
            .friction_rule
            .resolve(other.friction_rule)
            .apply(self.friction, other.friction);
        let elasticity = self
            .elasticity_rule
            .resolve(other.elasticity_rule)
            .apply(self.elasticity, other.elasticity);
        ContactMaterial {
            friction: friction.max(0.0),
            elasticity: elasticity.clamp(0.0, 1.0),
        }
    }
}
