//! Rigid body types and storage handles

use std::fmt;
use std::sync::Arc;

use impulse_math::{Mat3, Mat4, Quat, Transform, Vec3, AABB};
use impulse_structures::SlotKey;

use crate::layers::CollisionGroups;
use crate::material::PhysicsMaterial;
use crate::shape::{CollisionShape, WorldShape};

/// Smoothing factor of the rest-test moving average
pub const REST_SMOOTHING: f32 = 0.15;

/// Callback invoked as `(this body, other body)` when a collision is found.
///
/// Returning `false` vetoes the physical response for that pair; the
/// collision is still reported.
pub type CollisionCallback = Arc<dyn Fn(BodyHandle, BodyHandle) -> bool + Send + Sync>;

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BodyHandle(pub(crate) SlotKey<RigidBody>);

impl BodyHandle {
    /// Handle that never refers to a live body
    pub fn null() -> Self {
        Self(SlotKey::null())
    }

    pub fn from_raw(key: SlotKey<RigidBody>) -> Self {
        Self(key)
    }

    pub fn raw(&self) -> SlotKey<RigidBody> {
        self.0
    }

    /// Storage slot; stable for the body's lifetime
    pub fn index(&self) -> u32 {
        self.0.index()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Description for creating a rigid body
#[derive(Clone)]
pub struct RigidBodyDesc {
    pub shape: Arc<CollisionShape>,
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Mass (if 0, derived from material density and shape volume)
    pub mass: f32,
    pub material: PhysicsMaterial,
    /// Never integrated, infinite mass
    pub is_static: bool,
    /// Start asleep
    pub at_rest: bool,
    pub groups: CollisionGroups,
}

impl RigidBodyDesc {
    /// Dynamic body description
    pub fn dynamic(shape: Arc<CollisionShape>) -> Self {
        Self {
            shape,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 0.0,
            material: PhysicsMaterial::default(),
            is_static: false,
            at_rest: false,
            groups: CollisionGroups::default(),
        }
    }

    /// Static body description
    pub fn fixed(shape: Arc<CollisionShape>) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(shape)
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self
    }

    /// Set rotation from euler angles (radians)
    pub fn with_rotation_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.orientation = Quat::from_euler(x, y, z);
        self
    }

    pub fn with_linear_velocity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.linear_velocity = Vec3::new(x, y, z);
        self
    }

    pub fn with_angular_velocity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.angular_velocity = Vec3::new(x, y, z);
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_groups(mut self, groups: CollisionGroups) -> Self {
        self.groups = groups;
        self
    }

    pub fn sleeping(mut self, at_rest: bool) -> Self {
        self.at_rest = at_rest;
        self
    }
}

/// Simulated rigid body.
///
/// Mutators invalidate the cached world transform and bounds and wake the
/// body; `PhysicsWorld` refreshes the caches once per step.
pub struct RigidBody {
    uid: u64,
    pub(crate) position: Vec3,
    pub(crate) orientation: Quat,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    mass: f32,
    inv_mass: f32,
    inv_inertia_local: Mat3,
    inv_inertia_world: Mat3,
    material: PhysicsMaterial,
    is_static: bool,
    at_rest: bool,
    rest_average: f32,
    rest_threshold: f32,
    groups: CollisionGroups,
    shape: Arc<CollisionShape>,
    callback: Option<CollisionCallback>,
    cached_transform: Option<Mat4>,
    cached_aabb: Option<AABB>,
}

impl RigidBody {
    pub(crate) fn from_desc(desc: RigidBodyDesc, rest_threshold: f32, uid: u64) -> Self {
        let mass = if desc.mass > 0.0 {
            desc.mass
        } else {
            (desc.material.density * desc.shape.volume()).max(f32::EPSILON)
        };

        let mut body = Self {
            uid,
            position: desc.position,
            orientation: desc.orientation.normalize(),
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            mass,
            inv_mass: 0.0,
            inv_inertia_local: Mat3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            material: desc.material,
            is_static: desc.is_static,
            at_rest: false,
            rest_average: wake_average(rest_threshold),
            rest_threshold,
            groups: desc.groups,
            shape: desc.shape,
            callback: None,
            cached_transform: None,
            cached_aabb: None,
        };
        body.rebuild_mass_properties();
        if desc.at_rest {
            body.sleep();
        }
        if body.is_static {
            body.linear_velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        }
        body
    }

    // ==================== Identity & Pose ====================

    /// Random identity, independent of the storage slot
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate_cache();
        self.wake();
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        self.refresh_world_inertia();
        self.invalidate_cache();
        self.wake();
    }

    // ==================== Motion ====================

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        if self.is_static {
            return;
        }
        self.linear_velocity = velocity;
        self.wake();
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.is_static {
            return;
        }
        self.angular_velocity = velocity;
        self.wake();
    }

    /// Velocity of the point at offset `r` from the center of mass
    #[inline]
    pub fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    /// Persistent force, applied every step until changed
    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn set_force(&mut self, force: Vec3) {
        self.force = force;
        self.wake();
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    pub fn set_torque(&mut self, torque: Vec3) {
        self.torque = torque;
        self.wake();
    }

    /// Apply an impulse through the center of mass
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.apply_impulse_at(Vec3::ZERO, impulse);
    }

    /// Apply an impulse at offset `r` from the center of mass.
    ///
    /// A non-negligible impulse wakes a resting body.
    pub fn apply_impulse_at(&mut self, r: Vec3, impulse: Vec3) {
        if self.is_static || self.inv_mass == 0.0 {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * r.cross(impulse);
        if impulse.length_squared() > f32::EPSILON * f32::EPSILON {
            self.wake();
        }
    }

    /// Solver impulse at offset `r`. A resting body ignores impulses whose
    /// velocity change stays within its rest threshold, so an awake body
    /// leaning on it cannot hold it awake.
    pub(crate) fn apply_contact_impulse(&mut self, r: Vec3, impulse: Vec3) {
        if self.is_static || self.inv_mass == 0.0 {
            return;
        }
        let dv = impulse * self.inv_mass;
        let dw = self.inv_inertia_world * r.cross(impulse);
        if self.at_rest {
            if dv.length_squared() + dw.length_squared() <= self.rest_threshold {
                return;
            }
            self.wake();
        }
        self.linear_velocity += dv;
        self.angular_velocity += dw;
    }

    // ==================== Mass ====================

    /// Mass; infinite for static bodies
    pub fn mass(&self) -> f32 {
        if self.is_static {
            f32::INFINITY
        } else {
            self.mass
        }
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Set mass and rebuild the inertia tensor
    pub fn set_mass(&mut self, mass: f32) {
        if !(mass.is_finite() && mass > 0.0) {
            log::warn!("Ignoring invalid mass {} for body {:#x}", mass, self.uid);
            return;
        }
        self.mass = mass;
        self.rebuild_mass_properties();
        self.wake();
    }

    /// World-space inverse inertia `R · I⁻¹ · Rᵀ`
    pub fn inverse_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    pub fn inverse_inertia_local(&self) -> Mat3 {
        self.inv_inertia_local
    }

    fn rebuild_mass_properties(&mut self) {
        self.inv_mass = if self.is_static { 0.0 } else { 1.0 / self.mass };
        self.inv_inertia_local = self.shape.build_inverse_inertia(self.inv_mass);
        self.refresh_world_inertia();
    }

    pub(crate) fn refresh_world_inertia(&mut self) {
        self.inv_inertia_world = self
            .inv_inertia_local
            .rotated(&self.orientation.to_mat3());
    }

    // ==================== Material ====================

    pub fn material(&self) -> &PhysicsMaterial {
        &self.material
    }

    pub fn set_material(&mut self, material: PhysicsMaterial) {
        self.material = material;
    }

    pub fn friction(&self) -> f32 {
        self.material.friction
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.material.friction = friction.max(0.0);
    }

    pub fn elasticity(&self) -> f32 {
        self.material.elasticity
    }

    pub fn set_elasticity(&mut self, elasticity: f32) {
        self.material.elasticity = elasticity.clamp(0.0, 1.0);
    }

    // ==================== Flags ====================

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Make the body static (infinite mass, never integrated) or dynamic again
    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        if is_static {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self.rebuild_mass_properties();
        self.wake();
    }

    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    pub fn set_at_rest(&mut self, at_rest: bool) {
        if at_rest {
            self.sleep();
        } else {
            self.wake();
        }
    }

    /// Clear the at-rest flag. A resting body restarts its rest average
    /// above threshold; an awake body keeps its running average.
    pub fn wake(&mut self) {
        if self.at_rest {
            self.at_rest = false;
            self.rest_average = wake_average(self.rest_threshold);
        }
    }

    fn sleep(&mut self) {
        self.at_rest = true;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Current value of the rest-test moving average
    pub fn rest_average(&self) -> f32 {
        self.rest_average
    }

    /// Fold this step's kinetic measure into the moving average and
    /// classify the body. A negative threshold disables resting.
    pub(crate) fn update_rest_state(&mut self) {
        if self.is_static || self.at_rest || self.rest_threshold < 0.0 {
            return;
        }
        let motion = self.linear_velocity.length_squared() + self.angular_velocity.length_squared();
        self.rest_average = self.rest_average * (1.0 - REST_SMOOTHING) + motion * REST_SMOOTHING;
        if self.rest_average < self.rest_threshold {
            self.sleep();
        }
    }

    // ==================== Collision ====================

    pub fn groups(&self) -> CollisionGroups {
        self.groups
    }

    pub fn set_collision_groups(&mut self, groups: CollisionGroups) {
        self.groups = groups;
        self.wake();
    }

    pub fn shape(&self) -> &Arc<CollisionShape> {
        &self.shape
    }

    /// Replace the shape; inertia and bounds are rebuilt
    pub fn set_shape(&mut self, shape: Arc<CollisionShape>) {
        self.shape = shape;
        self.rebuild_mass_properties();
        self.invalidate_cache();
        self.wake();
    }

    pub fn world_shape(&self) -> WorldShape<'_> {
        WorldShape::new(&self.shape, &self.transform())
    }

    pub fn set_collision_callback<F>(&mut self, callback: F)
    where
        F: Fn(BodyHandle, BodyHandle) -> bool + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    pub fn clear_collision_callback(&mut self) {
        self.callback = None;
    }

    pub fn collision_callback(&self) -> Option<&CollisionCallback> {
        self.callback.as_ref()
    }

    // ==================== Cached Queries ====================

    /// World transform matrix, from cache when valid
    pub fn world_matrix(&self) -> Mat4 {
        self.cached_transform
            .unwrap_or_else(|| Mat4::from_rotation_translation(self.orientation, self.position))
    }

    /// World bounds, from cache when valid
    pub fn aabb(&self) -> AABB {
        self.cached_aabb.unwrap_or_else(|| self.world_shape().aabb())
    }

    pub fn has_valid_cache(&self) -> bool {
        self.cached_transform.is_some() && self.cached_aabb.is_some()
    }

    /// Recompute the cached transform and bounds if they were invalidated
    pub(crate) fn refresh_cache(&mut self) {
        if self.cached_transform.is_none() {
            self.cached_transform = Some(Mat4::from_rotation_translation(self.orientation, self.position));
        }
        if self.cached_aabb.is_none() {
            self.cached_aabb = Some(self.world_shape().aabb());
        }
    }

    pub(crate) fn invalidate_cache(&mut self) {
        self.cached_transform = None;
        self.cached_aabb = None;
    }
}

impl fmt::Debug for RigidBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidBody")
            .field("uid", &format_args!("{:#x}", self.uid))
            .field("shape", &self.shape.kind())
            .field("position", &self.position)
            .field("linear_velocity", &self.linear_velocity)
            .field("is_static", &self.is_static)
            .field("at_rest", &self.at_rest)
            .finish()
    }
}

/// Rest average assigned on wake, far enough above the threshold that a
/// few still steps are needed before sleeping again
fn wake_average(threshold: f32) -> f32 {
    threshold.max(1e-4) * 2.0
}
