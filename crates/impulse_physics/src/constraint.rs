//! Constraints solved alongside contacts
//!
//! Constraints are owned by the caller and passed to
//! [`PhysicsWorld::step_with_constraints`](crate::world::PhysicsWorld::step_with_constraints).
//! Each step runs `pre_solve` once, then `solve` once per velocity
//! iteration, interleaved with the contact manifolds. Constraints that name
//! a destroyed body are skipped.

use impulse_math::{Transform, Vec3};
use impulse_structures::SlotArena;
use serde::{Deserialize, Serialize};

use crate::body::{BodyHandle, RigidBody};

/// Body separations shorter than this give no usable direction
const MIN_SEPARATION: f32 = 1e-6;

/// Per-axis motion locks in world space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAxes {
    /// Lock translation on X axis
    pub lock_translation_x: bool,
    /// Lock translation on Y axis
    pub lock_translation_y: bool,
    /// Lock translation on Z axis
    pub lock_translation_z: bool,
    /// Lock rotation on X axis
    pub lock_rotation_x: bool,
    /// Lock rotation on Y axis
    pub lock_rotation_y: bool,
    /// Lock rotation on Z axis
    pub lock_rotation_z: bool,
}

impl LockedAxes {
    /// No locks
    pub const NONE: Self = Self {
        lock_translation_x: false,
        lock_translation_y: false,
        lock_translation_z: false,
        lock_rotation_x: false,
        lock_rotation_y: false,
        lock_rotation_z: false,
    };

    /// Lock all rotation
    pub const LOCK_ROTATION: Self = Self {
        lock_translation_x: false,
        lock_translation_y: false,
        lock_translation_z: false,
        lock_rotation_x: true,
        lock_rotation_y: true,
        lock_rotation_z: true,
    };

    /// Lock Y rotation only (upright characters)
    pub const LOCK_ROTATION_Y: Self = Self {
        lock_translation_x: false,
        lock_translation_y: false,
        lock_translation_z: false,
        lock_rotation_x: false,
        lock_rotation_y: true,
        lock_rotation_z: false,
    };

    /// Keep movement in the XY plane
    pub const PLANAR_XY: Self = Self {
        lock_translation_x: false,
        lock_translation_y: false,
        lock_translation_z: true,
        lock_rotation_x: true,
        lock_rotation_y: true,
        lock_rotation_z: false,
    };

    fn mask(x: bool, y: bool, z: bool, v: Vec3) -> Vec3 {
        Vec3::new(
            if x { 0.0 } else { v.x },
            if y { 0.0 } else { v.y },
            if z { 0.0 } else { v.z },
        )
    }

    pub fn filter_linear(&self, v: Vec3) -> Vec3 {
        Self::mask(
            self.lock_translation_x,
            self.lock_translation_y,
            self.lock_translation_z,
            v,
        )
    }

    pub fn filter_angular(&self, w: Vec3) -> Vec3 {
        Self::mask(self.lock_rotation_x, self.lock_rotation_y, self.lock_rotation_z, w)
    }
}

/// Zero the locked velocity components of one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLockConstraint {
    pub body: BodyHandle,
    pub axes: LockedAxes,
}

/// Damped spring between two centers of mass.
///
/// Solved as a soft distance constraint: stiffness and damping set how much
/// of the length error each step removes, so stiff springs stay stable at
/// the fixed timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub rest_length: f32,
    /// Force per unit of stretch
    pub stiffness: f32,
    /// Force per unit of opening speed
    pub damping: f32,
    /// Impulse accumulated this step, positive when pulling the bodies together
    pub accumulated: f32,
}

/// Rigid attachment: B follows A at a fixed relative pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Pose of B in A's frame
    pub relative: Transform,
}

/// Rigid rod between two centers of mass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub rest_length: f32,
    /// Impulse accumulated this step
    pub accumulated: f32,
}

/// Any constraint the world can solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    AxisLock(AxisLockConstraint),
    Spring(SpringConstraint),
    Weld(WeldConstraint),
    Distance(DistanceConstraint),
}

impl Constraint {
    pub fn axis_lock(body: BodyHandle, axes: LockedAxes) -> Self {
        Self::AxisLock(AxisLockConstraint { body, axes })
    }

    pub fn spring(
        body_a: BodyHandle,
        body_b: BodyHandle,
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    ) -> Self {
        Self::Spring(SpringConstraint {
            body_a,
            body_b,
            rest_length,
            stiffness,
            damping,
            accumulated: 0.0,
        })
    }

    /// Weld with an explicit relative pose; see
    /// [`PhysicsWorld::weld_constraint`](crate::world::PhysicsWorld::weld_constraint)
    /// to capture the current one
    pub fn weld(body_a: BodyHandle, body_b: BodyHandle, relative: Transform) -> Self {
        Self::Weld(WeldConstraint {
            body_a,
            body_b,
            relative,
        })
    }

    pub fn distance(body_a: BodyHandle, body_b: BodyHandle, rest_length: f32) -> Self {
        Self::Distance(DistanceConstraint {
            body_a,
            body_b,
            rest_length,
            accumulated: 0.0,
        })
    }

    /// Bodies this constraint acts on
    pub fn bodies(&self) -> (BodyHandle, Option<BodyHandle>) {
        match self {
            Self::AxisLock(c) => (c.body, None),
            Self::Spring(c) => (c.body_a, Some(c.body_b)),
            Self::Weld(c) => (c.body_a, Some(c.body_b)),
            Self::Distance(c) => (c.body_a, Some(c.body_b)),
        }
    }

    /// Once per step, before the velocity iterations
    pub fn pre_solve(&mut self, _bodies: &mut SlotArena<RigidBody>, _dt: f32) {
        match self {
            Self::Spring(c) => c.accumulated = 0.0,
            Self::Distance(c) => c.accumulated = 0.0,
            Self::AxisLock(_) | Self::Weld(_) => {}
        }
    }

    /// Once per velocity iteration
    pub fn solve(&mut self, bodies: &mut SlotArena<RigidBody>, baumgarte_scalar: f32, dt: f32) {
        match self {
            Self::AxisLock(c) => c.solve(bodies),
            Self::Spring(c) => c.solve(bodies, dt),
            Self::Weld(c) => c.solve(bodies),
            Self::Distance(c) => c.solve(bodies, baumgarte_scalar, dt),
        }
    }
}

impl AxisLockConstraint {
    fn solve(&self, bodies: &mut SlotArena<RigidBody>) {
        let Some(body) = bodies.get_mut(self.body.0) else {
            return;
        };
        if body.is_static() {
            return;
        }
        body.linear_velocity = self.axes.filter_linear(body.linear_velocity);
        body.angular_velocity = self.axes.filter_angular(body.angular_velocity);
    }
}

/// Unit direction A→B and current length
fn separation(a: &RigidBody, b: &RigidBody) -> Option<(Vec3, f32)> {
    let delta = b.position() - a.position();
    let length = delta.length();
    (length > MIN_SEPARATION).then(|| (delta / length, length))
}

impl SpringConstraint {
    /// One sequential-impulse iteration of the soft constraint
    /// `opening + bias = gamma * accumulated`.
    fn solve(&mut self, bodies: &mut SlotArena<RigidBody>, dt: f32) {
        let Some((a, b)) = bodies.get2_mut(self.body_a.0, self.body_b.0) else {
            return;
        };
        let k = a.inv_mass() + b.inv_mass();
        let response = self.damping + dt * self.stiffness;
        if k <= 0.0 || dt <= 0.0 || response <= f32::EPSILON {
            return;
        }
        let Some((n, length)) = separation(a, b) else {
            return;
        };

        let gamma = 1.0 / (dt * response);
        let bias = (length - self.rest_length) * self.stiffness / response;
        let opening_speed = (b.linear_velocity() - a.linear_velocity()).dot(n);
        let lambda = (opening_speed + bias - gamma * self.accumulated) / (k + gamma);
        self.accumulated += lambda;

        a.apply_impulse(n * lambda);
        b.apply_impulse(-(n * lambda));
    }
}

impl DistanceConstraint {
    fn solve(&mut self, bodies: &mut SlotArena<RigidBody>, baumgarte_scalar: f32, dt: f32) {
        let Some((a, b)) = bodies.get2_mut(self.body_a.0, self.body_b.0) else {
            return;
        };
        let k = a.inv_mass() + b.inv_mass();
        if k <= 0.0 || dt <= 0.0 {
            return;
        }
        let Some((n, length)) = separation(a, b) else {
            return;
        };

        let error = length - self.rest_length;
        let opening_speed = (b.linear_velocity() - a.linear_velocity()).dot(n);
        let lambda = (opening_speed + (baumgarte_scalar / dt) * error) / k;
        self.accumulated += lambda;

        a.apply_impulse(n * lambda);
        b.apply_impulse(-(n * lambda));
    }
}

impl WeldConstraint {
    fn solve(&self, bodies: &mut SlotArena<RigidBody>) {
        let Some((a, b)) = bodies.get2_mut(self.body_a.0, self.body_b.0) else {
            return;
        };
        if b.is_static() {
            return;
        }

        let target = a.transform().combine(&self.relative);
        let lever = target.position - a.position();
        b.position = target.position;
        b.orientation = target.rotation;
        b.linear_velocity = a.linear_velocity() + a.angular_velocity().cross(lever);
        b.angular_velocity = a.angular_velocity();
        b.refresh_world_inertia();
        b.invalidate_cache();
        if !a.is_at_rest() && b.is_at_rest() {
            b.wake();
        }
    }
}
