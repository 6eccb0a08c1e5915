//! Sequential impulse contact solver
//!
//! Normals point from A to B. The relative velocity is taken as A minus B,
//! so a positive normal component means the bodies approach. Normal impulses
//! are applied to A along `n` and to B along `-n`; the accumulated value per
//! contact is clamped to `<= 0` so contacts only ever push apart.

use impulse_math::{Mat3, Vec3};
use impulse_structures::SlotArena;

use crate::body::RigidBody;
use crate::config::PhysicsConfig;
use crate::manifold::{ContactPoint, Manifold, RESTITUTION_VELOCITY_THRESHOLD};

/// Relative tangential speeds below this produce no friction
const FRICTION_MIN_SPEED: f32 = 1e-6;

/// Constants shared by every manifold during one step
#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    pub baumgarte_scalar: f32,
    pub baumgarte_slop: f32,
    pub dt: f32,
}

impl SolverSettings {
    pub fn from_config(config: &PhysicsConfig, dt: f32) -> Self {
        Self {
            baumgarte_scalar: config.baumgarte_scalar,
            baumgarte_slop: config.baumgarte_slop,
            dt,
        }
    }

    /// Velocity bias removing penetration beyond the slop
    #[inline]
    pub fn baumgarte_bias(&self, penetration: f32) -> f32 {
        if self.dt <= 0.0 {
            return 0.0;
        }
        -(self.baumgarte_scalar / self.dt) * (penetration + self.baumgarte_slop).min(0.0)
    }
}

/// Dynamic and awake: the only bodies the solver moves
#[inline]
fn is_active(body: &RigidBody) -> bool {
    !body.is_static() && !body.is_at_rest()
}

/// Effective mass denominator along `dir`
#[inline]
fn effective_mass(a: &RigidBody, ra: Vec3, b: &RigidBody, rb: Vec3, dir: Vec3) -> f32 {
    let angular = |inv_inertia: Mat3, r: Vec3| (inv_inertia * r.cross(dir)).cross(r);
    a.inv_mass()
        + b.inv_mass()
        + dir.dot(angular(a.inverse_inertia_world(), ra) + angular(b.inverse_inertia_world(), rb))
}

#[inline]
fn relative_velocity(a: &RigidBody, b: &RigidBody, contact: &ContactPoint) -> Vec3 {
    a.velocity_at(contact.offset_a) - b.velocity_at(contact.offset_b)
}

impl Manifold {
    /// Reset accumulators and compute restitution targets from the
    /// velocities before any impulse of this step.
    pub fn pre_solver_step(&mut self, bodies: &SlotArena<RigidBody>) {
        let (Some(a), Some(b)) = (bodies.get(self.body_a.0), bodies.get(self.body_b.0)) else {
            return;
        };
        let elasticity = self.elasticity;
        for contact in self.contacts.as_mut_slice() {
            contact.sum_impulse_normal = 0.0;
            contact.sum_impulse_friction = Vec3::ZERO;
            let approach = relative_velocity(a, b, contact).dot(contact.normal);
            contact.restitution_bias = if approach > RESTITUTION_VELOCITY_THRESHOLD {
                elasticity * approach
            } else {
                0.0
            };
        }
    }

    /// One solver iteration over every contact: normal impulse with
    /// Baumgarte bias, then Coulomb friction bounded by the accumulated
    /// normal impulse.
    pub fn apply_impulse(&mut self, bodies: &mut SlotArena<RigidBody>, settings: &SolverSettings) {
        let Some((a, b)) = bodies.get2_mut(self.body_a.0, self.body_b.0) else {
            return;
        };
        if !is_active(a) && !is_active(b) {
            return;
        }

        let friction = self.friction;
        for contact in self.contacts.as_mut_slice() {
            solve_normal(a, b, contact, settings);
            solve_friction(a, b, contact, friction);
        }
    }
}

fn solve_normal(a: &mut RigidBody, b: &mut RigidBody, contact: &mut ContactPoint, settings: &SolverSettings) {
    let n = contact.normal;
    let k = effective_mass(a, contact.offset_a, b, contact.offset_b, n);
    if k <= f32::EPSILON {
        return;
    }

    let dv = relative_velocity(a, b, contact);
    let bias = settings.baumgarte_bias(contact.penetration);
    let jn = -(dv.dot(n) + bias + contact.restitution_bias) / k;

    let previous = contact.sum_impulse_normal;
    contact.sum_impulse_normal = (previous + jn).min(0.0);
    let applied = contact.sum_impulse_normal - previous;

    a.apply_contact_impulse(contact.offset_a, n * applied);
    b.apply_contact_impulse(contact.offset_b, -(n * applied));
}

fn solve_friction(a: &mut RigidBody, b: &mut RigidBody, contact: &mut ContactPoint, friction: f32) {
    let n = contact.normal;
    let dv = relative_velocity(a, b, contact);
    let tangential = dv - n * dv.dot(n);
    let Some(t) = tangential.try_normalize(FRICTION_MIN_SPEED) else {
        return;
    };

    let k = effective_mass(a, contact.offset_a, b, contact.offset_b, t);
    if k <= f32::EPSILON {
        return;
    }
    let jt = -dv.dot(t) / k;

    let limit = friction * contact.sum_impulse_normal.abs();
    let previous = contact.sum_impulse_friction;
    let mut total = previous + t * jt;
    let length = total.length();
    if length > limit {
        total = if length > 0.0 { total * (limit / length) } else { Vec3::ZERO };
    }
    let applied = total - previous;
    contact.sum_impulse_friction = total;

    a.apply_contact_impulse(contact.offset_a, applied);
    b.apply_contact_impulse(contact.offset_b, -applied);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyHandle, RigidBodyDesc};
    use crate::material::PhysicsMaterial;
    use crate::shape::CollisionShape;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn settings() -> SolverSettings {
        SolverSettings {
            baumgarte_scalar: 0.2,
            baumgarte_slop: 0.01,
            dt: 1.0 / 60.0,
        }
    }

    /// Ball A falling onto static ground B; normal A→B is -Y
    fn setup(velocity: Vec3, material: PhysicsMaterial) -> (SlotArena<RigidBody>, Manifold) {
        let mut bodies = SlotArena::with_capacity(4);
        let shape = Arc::new(CollisionShape::sphere(1.0).unwrap());
        let ground_shape = Arc::new(CollisionShape::cuboid(Vec3::new(10.0, 1.0, 10.0)).unwrap());
        let ball = RigidBody::from_desc(
            RigidBodyDesc::dynamic(shape)
                .with_position(0.0, 1.0, 0.0)
                .with_linear_velocity(velocity.x, velocity.y, velocity.z)
                .with_material(material),
            0.05,
            1,
        );
        let ground = RigidBody::from_desc(
            RigidBodyDesc::fixed(ground_shape)
                .with_position(0.0, -1.0, 0.0)
                .with_material(material),
            0.05,
            2,
        );
        let ha = BodyHandle(bodies.try_insert(ball).unwrap());
        let hb = BodyHandle(bodies.try_insert(ground).unwrap());

        let mut manifold = Manifold::new(ha, bodies.get(ha.0).unwrap(), hb, bodies.get(hb.0).unwrap());
        let point = Vec3::ZERO;
        manifold.add_contact(ContactPoint {
            point,
            offset_a: point - Vec3::new(0.0, 1.0, 0.0),
            offset_b: point - Vec3::new(0.0, -1.0, 0.0),
            normal: Vec3::NEG_Y,
            penetration: 0.0,
            ..Default::default()
        });
        (bodies, manifold)
    }

    #[test]
    fn test_normal_impulse_stops_approach() {
        let (mut bodies, mut m) = setup(Vec3::new(0.0, -2.0, 0.0), PhysicsMaterial::new(0.0, 0.0));
        m.pre_solver_step(&bodies);
        for _ in 0..10 {
            m.apply_impulse(&mut bodies, &settings());
        }
        let ball = bodies.get(m.body_a.0).unwrap();
        assert_relative_eq!(ball.linear_velocity().y, 0.0, epsilon = 1e-4);
        assert!(m.contacts.iter().all(|c| c.sum_impulse_normal <= 0.0));
    }

    #[test]
    fn test_restitution_bounces() {
        let (mut bodies, mut m) = setup(Vec3::new(0.0, -2.0, 0.0), PhysicsMaterial::new(0.0, 1.0));
        m.pre_solver_step(&bodies);
        assert_relative_eq!(m.contacts[0].restitution_bias, 2.0, epsilon = 1e-5);
        for _ in 0..10 {
            m.apply_impulse(&mut bodies, &settings());
        }
        let ball = bodies.get(m.body_a.0).unwrap();
        assert_relative_eq!(ball.linear_velocity().y, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_separating_bodies_get_no_impulse() {
        let (mut bodies, mut m) = setup(Vec3::new(0.0, 3.0, 0.0), PhysicsMaterial::default());
        m.pre_solver_step(&bodies);
        m.apply_impulse(&mut bodies, &settings());
        assert_eq!(m.contacts[0].sum_impulse_normal, 0.0);
        let ball = bodies.get(m.body_a.0).unwrap();
        assert_relative_eq!(ball.linear_velocity().y, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_friction_bounded_by_normal_impulse() {
        let (mut bodies, mut m) = setup(Vec3::new(5.0, -1.0, 0.0), PhysicsMaterial::new(0.3, 0.0));
        m.pre_solver_step(&bodies);
        for _ in 0..10 {
            m.apply_impulse(&mut bodies, &settings());
        }
        let c = m.contacts[0];
        assert!(c.sum_impulse_friction.length() <= 0.3 * c.sum_impulse_normal.abs() + 1e-5);
        let ball = bodies.get(m.body_a.0).unwrap();
        assert!(ball.linear_velocity().x < 5.0);
    }

    #[test]
    fn test_baumgarte_bias_ignores_slop() {
        let s = settings();
        assert_eq!(s.baumgarte_bias(-0.005), 0.0);
        assert!(s.baumgarte_bias(-0.1) > 0.0);
    }
}
