//! Physics configuration

use serde::{Deserialize, Serialize};

use crate::broadphase::BroadphaseKind;
use crate::error::{PhysicsError, Result};
use crate::integrator::IntegrationScheme;

/// Physics world configuration.
///
/// Every field has a default, so partial JSON/RON documents deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector (default: -9.81 in Y)
    pub gravity: [f32; 3],

    /// Fixed timestep for physics simulation
    pub timestep: f32,

    /// Maximum number of fixed steps run for one `step` call
    pub max_updates_per_frame: u32,

    /// Velocity multiplier applied after every integration
    pub damping: f32,

    /// Linear integration scheme
    pub integration_scheme: IntegrationScheme,

    /// Fraction of penetration corrected per step through the velocity bias
    pub baumgarte_scalar: f32,

    /// Penetration tolerated before the bias kicks in
    pub baumgarte_slop: f32,

    /// Solver iterations over manifolds and constraints
    pub velocity_iterations: usize,

    /// Integration sub-steps per fixed step
    pub position_iterations: usize,

    /// Body store capacity
    pub max_bodies: usize,

    /// Candidate pairs kept per step
    pub max_pairs: usize,

    /// Manifolds kept per step
    pub max_manifolds: usize,

    /// Rest-test threshold on the kinetic moving average (negative disables)
    pub rest_velocity_threshold: f32,

    /// Broadphase algorithm
    pub broadphase: BroadphaseKind,

    /// Octree node scratch capacity
    pub octree_node_capacity: usize,

    /// Octree body index scratch capacity
    pub octree_index_capacity: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            timestep: 1.0 / 60.0,
            max_updates_per_frame: 4,
            damping: 0.999,
            integration_scheme: IntegrationScheme::default(),
            baumgarte_scalar: 0.2,
            baumgarte_slop: 0.01,
            velocity_iterations: 10,
            position_iterations: 1,
            max_bodies: 1024,
            max_pairs: 8192,
            max_manifolds: 4096,
            rest_velocity_threshold: 0.05,
            broadphase: BroadphaseKind::default(),
            octree_node_capacity: 4096,
            octree_index_capacity: 32768,
        }
    }
}

impl PhysicsConfig {
    /// Create a configuration for high-precision simulation
    pub fn high_precision() -> Self {
        Self {
            velocity_iterations: 20,
            position_iterations: 4,
            max_updates_per_frame: 8,
            integration_scheme: IntegrationScheme::RungeKutta4,
            ..Default::default()
        }
    }

    /// Create a configuration for fast simulation (lower quality)
    pub fn fast() -> Self {
        Self {
            velocity_iterations: 4,
            position_iterations: 1,
            max_updates_per_frame: 2,
            ..Default::default()
        }
    }

    /// Set gravity
    pub fn with_gravity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gravity = [x, y, z];
        self
    }

    /// Set timestep
    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set body capacity
    pub fn with_max_bodies(mut self, max_bodies: usize) -> Self {
        self.max_bodies = max_bodies;
        self
    }

    /// Set broadphase algorithm
    pub fn with_broadphase(mut self, broadphase: BroadphaseKind) -> Self {
        self.broadphase = broadphase;
        self
    }

    /// Set integration scheme
    pub fn with_integration_scheme(mut self, scheme: IntegrationScheme) -> Self {
        self.integration_scheme = scheme;
        self
    }

    /// Set the rest-test threshold (negative disables resting)
    pub fn with_rest_threshold(mut self, threshold: f32) -> Self {
        self.rest_velocity_threshold = threshold;
        self
    }

    /// Reject values the stepper or solver cannot work with
    pub fn validate(&self) -> Result<()> {
        fn invalid(message: impl Into<String>) -> Result<()> {
            Err(PhysicsError::InvalidConfig(message.into()))
        }

        if !self.gravity.iter().all(|g| g.is_finite()) {
            return invalid("gravity must be finite");
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return invalid(format!("timestep must be positive, got {}", self.timestep));
        }
        if self.max_updates_per_frame == 0 {
            return invalid("max_updates_per_frame must be at least 1");
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return invalid(format!("damping must be in (0, 1], got {}", self.damping));
        }
        if !(0.0..=1.0).contains(&self.baumgarte_scalar) {
            return invalid(format!(
                "baumgarte_scalar must be in [0, 1], got {}",
                self.baumgarte_scalar
            ));
        }
        if !(self.baumgarte_slop.is_finite() && self.baumgarte_slop >= 0.0) {
            return invalid("baumgarte_slop must be non-negative");
        }
        if self.position_iterations == 0 {
            return invalid("position_iterations must be at least 1");
        }
        if self.max_bodies == 0 || self.max_pairs == 0 || self.max_manifolds == 0 {
            return invalid("body, pair and manifold capacities must be non-zero");
        }
        if self.octree_node_capacity == 0 || self.octree_index_capacity == 0 {
            return invalid("octree scratch capacities must be non-zero");
        }
        if !self.rest_velocity_threshold.is_finite() {
            return invalid("rest_velocity_threshold must be finite");
        }
        if let BroadphaseKind::Octree { max_objects_per_node, .. } = self.broadphase {
            if max_objects_per_node == 0 {
                return invalid("octree max_objects_per_node must be at least 1");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PhysicsConfig::default().validate().is_ok());
        assert!(PhysicsConfig::high_precision().validate().is_ok());
        assert!(PhysicsConfig::fast().validate().is_ok());
    }

    #[test]
    fn test_invalid_timestep() {
        let config = PhysicsConfig::default().with_timestep(0.0);
        assert!(matches!(config.validate(), Err(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_capacity() {
        let config = PhysicsConfig::default().with_max_bodies(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = PhysicsConfig::default()
            .with_gravity(0.0, -1.0, 0.0)
            .with_broadphase(BroadphaseKind::SortAndSweep);
        assert_eq!(config.gravity, [0.0, -1.0, 0.0]);
        assert_eq!(config.broadphase, BroadphaseKind::SortAndSweep);
    }
}
