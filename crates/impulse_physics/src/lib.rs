//! Impulse Physics - discrete-time 3D rigid-body simulation
//!
//! Convex bodies collide through a separating-axis test, contacts are
//! clipped into manifolds and resolved by a sequential impulse solver with
//! Baumgarte stabilisation and Coulomb friction.
//!
//! # Features
//!
//! - Spheres, capsules, cuboids, pyramids and arbitrary convex hulls
//! - Brute-force, octree and sort-and-sweep broadphases
//! - Axis-lock, spring, weld and distance constraints
//! - Explicit and semi-implicit Euler, RK2 and RK4 integration
//! - Rest detection, collision callbacks with veto, collision events
//! - Raycasting and point/bounds queries
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       PhysicsWorld                        │
//! │  ┌─────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ FixedStepper│  │ SlotArena of │  │ EventCollector   │  │
//! │  │ (timestep)  │  │ RigidBody    │  │ Query / Debug    │  │
//! │  └─────────────┘  └──────────────┘  └──────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//!                              │ every fixed step
//!     ┌──────────┬─────────────┼──────────────┬────────────┐
//!     ▼          ▼             ▼              ▼            ▼
//! ┌────────┐ ┌────────┐ ┌─────────────┐ ┌──────────┐ ┌──────────┐
//! │ Broad  │→│ Narrow │→│ Manifolds + │→│Integrator│→│ Rest test│
//! │ phase  │ │ (SAT)  │ │ Constraints │ │          │ │ + events │
//! └────────┘ └────────┘ └─────────────┘ └──────────┘ └──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use impulse_physics::prelude::*;
//!
//! let mut physics = PhysicsWorld::new(PhysicsConfig::default())?;
//!
//! let ground = Arc::new(CollisionShape::cuboid(Vec3::new(10.0, 1.0, 10.0))?);
//! physics.create_body(RigidBodyDesc::fixed(ground).with_position(0.0, -1.0, 0.0))?;
//!
//! let ball = Arc::new(CollisionShape::sphere(0.5)?);
//! let handle = physics.create_body(RigidBodyDesc::dynamic(ball).with_position(0.0, 5.0, 0.0))?;
//!
//! physics.step(1.0 / 60.0);
//! let y = physics.body_position(handle)?.y;
//! ```

pub mod body;
pub mod broadphase;
pub mod config;
pub mod constraint;
pub mod debug;
pub mod error;
pub mod events;
pub mod integrator;
pub mod layers;
pub mod manifold;
pub mod material;
pub mod narrowphase;
pub mod query;
pub mod shape;
pub mod solver;
pub mod stepper;
pub mod world;

pub mod prelude {
    //! Common imports for physics functionality
    pub use crate::body::{BodyHandle, RigidBody, RigidBodyDesc};
    pub use crate::broadphase::{Broadphase, BroadphaseKind};
    pub use crate::config::PhysicsConfig;
    pub use crate::constraint::{Constraint, LockedAxes};
    pub use crate::debug::{DebugDrawFlags, DebugSnapshot};
    pub use crate::error::{PhysicsError, Result};
    pub use crate::events::{CollisionEvent, CollisionEventType, ContactData, PhysicsEventHandler};
    pub use crate::integrator::IntegrationScheme;
    pub use crate::layers::{CollisionGroups, CollisionLayer};
    pub use crate::material::{CombineRule, PhysicsMaterial};
    pub use crate::narrowphase::CollisionData;
    pub use crate::query::{RaycastHit, RaycastOptions};
    pub use crate::shape::{CollisionShape, ShapeKind};
    pub use crate::world::{PhysicsStats, PhysicsWorld};
    pub use impulse_math::{Quat, Ray, Vec3};
}

pub use prelude::*;
