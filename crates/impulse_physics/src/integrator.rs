//! Numerical integration of body state
//!
//! Linear motion uses the configured scheme. Angular motion always uses a
//! symplectic update followed by quaternion integration.

use impulse_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::body::RigidBody;

/// Linear integration scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegrationScheme {
    /// Position from the old velocity, then velocity
    ExplicitEuler,
    /// Velocity first, position from the new velocity
    #[default]
    SymplecticEuler,
    /// Midpoint method
    RungeKutta2,
    /// Classic fourth-order Runge-Kutta
    RungeKutta4,
}

/// Advance `(position, velocity)` by `dt` under `acceleration(position, velocity)`
pub fn integrate_linear<F>(
    scheme: IntegrationScheme,
    position: Vec3,
    velocity: Vec3,
    dt: f32,
    acceleration: F,
) -> (Vec3, Vec3)
where
    F: Fn(Vec3, Vec3) -> Vec3,
{
    match scheme {
        IntegrationScheme::ExplicitEuler => {
            let a = acceleration(position, velocity);
            (position + velocity * dt, velocity + a * dt)
        }
        IntegrationScheme::SymplecticEuler => {
            let v = velocity + acceleration(position, velocity) * dt;
            (position + v * dt, v)
        }
        IntegrationScheme::RungeKutta2 => {
            let half = dt * 0.5;
            let a1 = acceleration(position, velocity);
            let mid_x = position + velocity * half;
            let mid_v = velocity + a1 * half;
            let a2 = acceleration(mid_x, mid_v);
            (position + mid_v * dt, velocity + a2 * dt)
        }
        IntegrationScheme::RungeKutta4 => {
            let half = dt * 0.5;
            let (k1x, k1v) = (velocity, acceleration(position, velocity));
            let (k2x, k2v) = {
                let v = velocity + k1v * half;
                (v, acceleration(position + k1x * half, v))
            };
            let (k3x, k3v) = {
                let v = velocity + k2v * half;
                (v, acceleration(position + k2x * half, v))
            };
            let (k4x, k4v) = {
                let v = velocity + k3v * dt;
                (v, acceleration(position + k3x * dt, v))
            };
            let sixth = dt / 6.0;
            (
                position + (k1x + k2x * 2.0 + k3x * 2.0 + k4x) * sixth,
                velocity + (k1v + k2v * 2.0 + k3v * 2.0 + k4v) * sixth,
            )
        }
    }
}

/// Advance one body by `dt`.
///
/// Static and resting bodies are left alone. Gravity only acts on bodies
/// with finite mass; velocities are scaled by `damping` afterwards.
pub fn integrate_body(
    body: &mut RigidBody,
    scheme: IntegrationScheme,
    gravity: Vec3,
    damping: f32,
    dt: f32,
) {
    if body.is_static() || body.is_at_rest() {
        return;
    }

    let inv_mass = body.inv_mass();
    let gravity = if inv_mass > 0.0 { gravity } else { Vec3::ZERO };
    let linear_acceleration = gravity + body.force() * inv_mass;
    let (position, velocity) = integrate_linear(
        scheme,
        body.position,
        body.linear_velocity,
        dt,
        |_, _| linear_acceleration,
    );
    body.position = position;
    body.linear_velocity = velocity * damping;

    let angular_acceleration = body.inverse_inertia_world() * body.torque();
    body.angular_velocity = (body.angular_velocity + angular_acceleration * dt) * damping;
    body.orientation = body.orientation.integrate(body.angular_velocity, dt);

    body.refresh_world_inertia();
    body.invalidate_cache();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyDesc;
    use crate::shape::CollisionShape;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    const G: Vec3 = Vec3::new(0.0, -10.0, 0.0);

    fn run(scheme: IntegrationScheme, steps: usize, dt: f32) -> (Vec3, Vec3) {
        let (mut x, mut v) = (Vec3::ZERO, Vec3::ZERO);
        for _ in 0..steps {
            (x, v) = integrate_linear(scheme, x, v, dt, |_, _| G);
        }
        (x, v)
    }

    #[test]
    fn test_explicit_euler_lags_exact_solution() {
        let (x, v) = run(IntegrationScheme::ExplicitEuler, 10, 0.1);
        assert_relative_eq!(v.y, -10.0, epsilon = 1e-4);
        // Σ_{k<10} v_k·dt = -10·dt²·45
        assert_relative_eq!(x.y, -4.5, epsilon = 1e-4);
    }

    #[test]
    fn test_symplectic_euler_leads_exact_solution() {
        let (x, _) = run(IntegrationScheme::SymplecticEuler, 10, 0.1);
        assert_relative_eq!(x.y, -5.5, epsilon = 1e-4);
    }

    #[test]
    fn test_runge_kutta_exact_under_constant_acceleration() {
        for scheme in [IntegrationScheme::RungeKutta2, IntegrationScheme::RungeKutta4] {
            let (x, v) = run(scheme, 10, 0.1);
            assert_relative_eq!(x.y, -5.0, epsilon = 1e-3);
            assert_relative_eq!(v.y, -10.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_rk4_harmonic_oscillator_beats_euler() {
        let spring = |x: Vec3, _v: Vec3| -x;
        let dt = 0.1;
        let mut rk = (Vec3::X, Vec3::ZERO);
        let mut eu = (Vec3::X, Vec3::ZERO);
        for _ in 0..63 {
            rk = integrate_linear(IntegrationScheme::RungeKutta4, rk.0, rk.1, dt, spring);
            eu = integrate_linear(IntegrationScheme::ExplicitEuler, eu.0, eu.1, dt, spring);
        }
        // Explicit Euler gains energy; RK4 stays close to the unit circle.
        let energy = |(x, v): (Vec3, Vec3)| x.length_squared() + v.length_squared();
        assert!((energy(rk) - 1.0).abs() < 1e-3);
        assert!(energy(eu) > 1.5);
    }

    #[test]
    fn test_static_and_resting_bodies_do_not_move() {
        let shape = Arc::new(CollisionShape::sphere(1.0).unwrap());
        let mut fixed = RigidBody::from_desc(RigidBodyDesc::fixed(shape.clone()), 0.05, 1);
        let mut resting =
            RigidBody::from_desc(RigidBodyDesc::dynamic(shape).sleeping(true), 0.05, 2);
        integrate_body(&mut fixed, IntegrationScheme::default(), G, 1.0, 0.1);
        integrate_body(&mut resting, IntegrationScheme::default(), G, 1.0, 0.1);
        assert_eq!(fixed.position(), Vec3::ZERO);
        assert_eq!(resting.position(), Vec3::ZERO);
    }

    #[test]
    fn test_spinning_body_rotates() {
        let shape = Arc::new(CollisionShape::cuboid(Vec3::ONE).unwrap());
        let mut body = RigidBody::from_desc(
            RigidBodyDesc::dynamic(shape).with_angular_velocity(0.0, 1.0, 0.0),
            -1.0,
            1,
        );
        integrate_body(&mut body, IntegrationScheme::default(), Vec3::ZERO, 1.0, 0.5);
        let forward = body.orientation().rotate(Vec3::X);
        assert!(forward.z < -0.4);
        assert!(!body.has_valid_cache());
    }
}
