//! Physics world - main simulation container

use crossbeam_channel::Receiver;
use impulse_math::{Quat, Ray, Vec3};
use impulse_memory::{Arena, FrameStorage};
use impulse_structures::SlotArena;
use serde::Serialize;

use crate::body::{BodyHandle, RigidBody, RigidBodyDesc};
use crate::broadphase::{create_broadphase, Broadphase, BroadphaseKind, BroadphaseProxy, CollisionPair};
use crate::config::PhysicsConfig;
use crate::constraint::Constraint;
use crate::debug::{DebugDrawFlags, DebugSnapshot};
use crate::error::{PhysicsError, Result};
use crate::events::{CollisionEvent, ContactData, EventCollector, PhysicsEventHandler};
use crate::integrator::integrate_body;
use crate::manifold::Manifold;
use crate::narrowphase::{Narrowphase, PairContact};
use crate::query::{PhysicsQuery, RaycastHit, RaycastOptions};
use crate::solver::SolverSettings;
use crate::stepper::FixedStepper;

/// Counters describing the last step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhysicsStats {
    /// Live bodies
    pub bodies: usize,
    /// Static bodies among them
    pub static_bodies: usize,
    /// Dynamic bodies currently at rest
    pub sleeping_bodies: usize,
    /// Candidate pairs from the broadphase
    pub candidate_pairs: usize,
    /// Pairs the narrowphase confirmed, vetoed ones included
    pub colliding_pairs: usize,
    /// Manifolds handed to the solver
    pub manifolds: usize,
    /// Contact points across all manifolds
    pub contacts: usize,
    /// Manifolds lost to the capacity limit
    pub dropped_manifolds: usize,
    /// Pairs skipped for lack of a collision routine
    pub unsupported_pairs: usize,
    /// Fixed steps run since creation
    pub steps: u64,
    /// Rolling average of time discarded per frame
    pub overrun_average: f32,
}

/// The main physics world containing all simulation state
pub struct PhysicsWorld {
    /// Configuration
    config: PhysicsConfig,

    /// Gravity
    gravity: Vec3,

    /// Body store
    bodies: SlotArena<RigidBody>,

    /// Broad phase
    broadphase: Box<dyn Broadphase>,

    /// Narrow phase and this step's manifolds
    narrowphase: Narrowphase,

    /// Per-step proxies
    proxies: Arena<BroadphaseProxy>,

    /// Per-step candidate pairs
    pairs: Arena<CollisionPair>,

    /// Narrowphase results awaiting event reporting
    pair_contacts: Vec<(CollisionPair, PairContact)>,

    /// Fixed timestep accumulator
    stepper: FixedStepper,

    /// Event collector
    events: EventCollector,

    /// Counters from the last step
    stats: PhysicsStats,
}

impl PhysicsWorld {
    /// Create a new physics world, rejecting invalid configuration
    pub fn new(config: PhysicsConfig) -> Result<Self> {
        config.validate()?;

        let gravity = Vec3::new(config.gravity[0], config.gravity[1], config.gravity[2]);
        log::info!(
            "Creating physics world: {} bodies max, {:?} broadphase, {:?} integration at {:.4}s",
            config.max_bodies,
            config.broadphase,
            config.integration_scheme,
            config.timestep
        );

        Ok(Self {
            gravity,
            bodies: SlotArena::with_capacity(config.max_bodies),
            broadphase: create_broadphase(config.broadphase, &config),
            narrowphase: Narrowphase::new(config.max_manifolds),
            proxies: Arena::new(config.max_bodies),
            pairs: Arena::new(config.max_pairs),
            pair_contacts: Vec::with_capacity(config.max_pairs),
            stepper: FixedStepper::new(config.timestep, config.max_updates_per_frame),
            events: EventCollector::new(),
            stats: PhysicsStats::default(),
            config,
        })
    }

    /// Get the physics configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Set gravity
    pub fn set_gravity(&mut self, x: f32, y: f32, z: f32) {
        self.gravity = Vec3::new(x, y, z);
        self.config.gravity = [x, y, z];
    }

    /// Get gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Switch broadphase algorithm; takes effect on the next step
    pub fn set_broadphase(&mut self, kind: BroadphaseKind) {
        log::debug!("Switching broadphase {:?} -> {:?}", self.config.broadphase, kind);
        self.config.broadphase = kind;
        self.broadphase = create_broadphase(kind, &self.config);
    }

    pub fn broadphase_kind(&self) -> BroadphaseKind {
        self.broadphase.kind()
    }

    /// Direct access to the narrowphase, e.g. to override dispatch entries
    pub fn narrowphase_mut(&mut self) -> &mut Narrowphase {
        &mut self.narrowphase
    }

    // ==================== Rigid Bodies ====================

    /// Create a rigid body
    pub fn create_body(&mut self, desc: RigidBodyDesc) -> Result<BodyHandle> {
        let body = RigidBody::from_desc(desc, self.config.rest_velocity_threshold, rand::random());
        match self.bodies.try_insert(body) {
            Ok(key) => Ok(BodyHandle(key)),
            Err(body) => {
                log::error!(
                    "Body store full ({} bodies), cannot create body {:#x}",
                    self.bodies.capacity(),
                    body.uid()
                );
                Err(PhysicsError::CapacityExceeded {
                    what: "body",
                    capacity: self.bodies.capacity(),
                })
            }
        }
    }

    /// Remove a rigid body; its slot is reused by a later create
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.bodies
            .remove(handle.0)
            .map(|body| log::trace!("Destroyed body {:#x} at {:?}", body.uid(), handle))
            .ok_or(PhysicsError::BodyNotFound(handle))
    }

    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle.0)
    }

    pub fn body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get(handle.0).ok_or(PhysicsError::BodyNotFound(handle))
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies
            .get_mut(handle.0)
            .ok_or(PhysicsError::BodyNotFound(handle))
    }

    /// Iterate over all live bodies
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter().map(|(key, body)| (BodyHandle(key), body))
    }

    /// Get rigid body position
    pub fn body_position(&self, handle: BodyHandle) -> Result<Vec3> {
        self.body(handle).map(RigidBody::position)
    }

    /// Set rigid body position
    pub fn set_body_position(&mut self, handle: BodyHandle, x: f32, y: f32, z: f32) -> Result<()> {
        self.body_mut(handle)
            .map(|b| b.set_position(Vec3::new(x, y, z)))
    }

    /// Get rigid body orientation
    pub fn body_orientation(&self, handle: BodyHandle) -> Result<Quat> {
        self.body(handle).map(RigidBody::orientation)
    }

    /// Set rigid body orientation
    pub fn set_body_orientation(&mut self, handle: BodyHandle, orientation: Quat) -> Result<()> {
        self.body_mut(handle).map(|b| b.set_orientation(orientation))
    }

    /// Get rigid body linear velocity
    pub fn body_linear_velocity(&self, handle: BodyHandle) -> Result<Vec3> {
        self.body(handle).map(RigidBody::linear_velocity)
    }

    /// Set rigid body linear velocity
    pub fn set_body_linear_velocity(&mut self, handle: BodyHandle, x: f32, y: f32, z: f32) -> Result<()> {
        self.body_mut(handle)
            .map(|b| b.set_linear_velocity(Vec3::new(x, y, z)))
    }

    /// Set rigid body angular velocity
    pub fn set_body_angular_velocity(&mut self, handle: BodyHandle, x: f32, y: f32, z: f32) -> Result<()> {
        self.body_mut(handle)
            .map(|b| b.set_angular_velocity(Vec3::new(x, y, z)))
    }

    /// Set the persistent force on a rigid body
    pub fn set_body_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<()> {
        self.body_mut(handle).map(|b| b.set_force(force))
    }

    /// Apply an impulse to a rigid body
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3) -> Result<()> {
        self.body_mut(handle).map(|b| b.apply_impulse(impulse))
    }

    /// Apply an impulse at a world point
    pub fn apply_impulse_at_point(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) -> Result<()> {
        self.body_mut(handle).map(|b| {
            let r = point - b.position();
            b.apply_impulse_at(r, impulse);
        })
    }

    /// Install a collision callback; returning false vetoes the response
    pub fn set_collision_callback<F>(&mut self, handle: BodyHandle, callback: F) -> Result<()>
    where
        F: Fn(BodyHandle, BodyHandle) -> bool + Send + Sync + 'static,
    {
        self.body_mut(handle).map(|b| b.set_collision_callback(callback))
    }

    /// Weld capturing the current pose of `b` relative to `a`
    pub fn weld_constraint(&self, a: BodyHandle, b: BodyHandle) -> Result<Constraint> {
        let body_a = self.body(a)?;
        let body_b = self.body(b)?;
        let relative = body_a.transform().inverse().combine(&body_b.transform());
        Ok(Constraint::weld(a, b, relative))
    }

    // ==================== Simulation ====================

    /// Advance by a frame's elapsed time; returns the fixed steps run
    pub fn step(&mut self, delta_time: f32) -> u32 {
        self.step_with_constraints(delta_time, &mut [])
    }

    /// Advance by a frame's elapsed time, solving `constraints` every step
    pub fn step_with_constraints(&mut self, delta_time: f32, constraints: &mut [Constraint]) -> u32 {
        let steps = self.stepper.advance(delta_time);
        for _ in 0..steps {
            self.step_internal(constraints);
        }
        self.stats.overrun_average = self.stepper.overrun_average();
        steps
    }

    /// While paused no time accumulates and no steps run
    pub fn set_paused(&mut self, paused: bool) {
        self.stepper.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.stepper.is_paused()
    }

    /// Fraction of a step left in the accumulator, for render interpolation
    pub fn interpolation_factor(&self) -> f32 {
        self.stepper.interpolation_factor()
    }

    /// Internal fixed timestep
    fn step_internal(&mut self, constraints: &mut [Constraint]) {
        let dt = self.config.timestep;

        // Per-step scratch
        self.proxies.reset();
        self.pairs.reset();
        self.narrowphase.reset();
        self.pair_contacts.clear();
        self.events.begin_step();

        // Caches and broadphase proxies
        for (key, body) in self.bodies.iter_mut() {
            body.refresh_cache();
            let proxy = BroadphaseProxy {
                handle: BodyHandle(key),
                aabb: body.aabb(),
                is_static: body.is_static(),
                at_rest: body.is_at_rest(),
                groups: body.groups(),
            };
            if self.proxies.alloc(proxy).is_none() {
                log::warn!("Proxy capacity {} reached", self.proxies.capacity());
                break;
            }
        }

        self.broadphase
            .find_potential_collision_pairs(self.proxies.as_slice(), &mut self.pairs);

        for pair in self.pairs.iter() {
            let (Some(a), Some(b)) = (self.bodies.get(pair.a.0), self.bodies.get(pair.b.0)) else {
                continue;
            };
            if let Some(contact) = self.narrowphase.process_pair(pair.a, a, pair.b, b) {
                self.pair_contacts.push((*pair, contact));
            }
        }

        // Solve contacts and constraints
        let settings = SolverSettings::from_config(&self.config, dt);
        let dropped_manifolds = self.narrowphase.manifolds().dropped();
        let manifolds = self.narrowphase.manifolds_mut().get_mut();
        for manifold in manifolds.as_mut_slice() {
            manifold.pre_solver_step(&self.bodies);
        }
        for constraint in constraints.iter_mut() {
            constraint.pre_solve(&mut self.bodies, dt);
        }
        for _ in 0..self.config.velocity_iterations {
            for manifold in manifolds.as_mut_slice() {
                manifold.apply_impulse(&mut self.bodies, &settings);
            }
            for constraint in constraints.iter_mut() {
                constraint.solve(&mut self.bodies, self.config.baumgarte_scalar, dt);
            }
        }

        // Integrate
        let substeps = self.config.position_iterations.max(1);
        let sub_dt = dt / substeps as f32;
        let damping = self.config.damping.powf(1.0 / substeps as f32);
        let scheme = self.config.integration_scheme;
        for _ in 0..substeps {
            for body in self.bodies.values_mut() {
                integrate_body(body, scheme, self.gravity, damping, sub_dt);
            }
        }

        for body in self.bodies.values_mut() {
            body.update_rest_state();
        }

        // Events, with the impulses the solver settled on
        for (pair, contact) in &self.pair_contacts {
            match contact.manifold.and_then(|i| manifolds.get(i)) {
                Some(manifold) => {
                    let contacts = manifold.contacts.iter().map(ContactData::from);
                    self.events.record(pair.a, pair.b, contact.vetoed, contacts);
                }
                None => {
                    let single = ContactData {
                        point: contact.data.point,
                        normal: contact.data.normal,
                        depth: contact.data.penetration,
                        impulse: 0.0,
                    };
                    self.events.record(pair.a, pair.b, contact.vetoed, [single]);
                }
            }
        }
        self.events.finish_step();

        self.stats = PhysicsStats {
            bodies: self.bodies.len(),
            static_bodies: self.bodies.values().filter(|b| b.is_static()).count(),
            sleeping_bodies: self
                .bodies
                .values()
                .filter(|b| !b.is_static() && b.is_at_rest())
                .count(),
            candidate_pairs: self.pairs.len(),
            colliding_pairs: self.pair_contacts.len(),
            manifolds: manifolds.len(),
            contacts: manifolds.iter().map(Manifold::contact_count).sum(),
            dropped_manifolds,
            unsupported_pairs: self.narrowphase.unsupported_pairs(),
            steps: self.stats.steps + 1,
            overrun_average: self.stepper.overrun_average(),
        };
    }

    // ==================== Queries ====================

    /// Get a query interface for raycasting and bounds queries
    pub fn query(&self) -> PhysicsQuery<'_> {
        PhysicsQuery {
            bodies: &self.bodies,
        }
    }

    /// Nearest body hit by `ray` within `max_distance`
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RaycastHit> {
        self.query()
            .raycast(ray, &RaycastOptions::default().with_max_distance(max_distance))
    }

    // ==================== Events ====================

    /// Get collision events from the last step
    pub fn collision_events(&self) -> &[CollisionEvent] {
        self.events.events()
    }

    /// Get collision start events
    pub fn collision_started(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.started_collisions()
    }

    /// Get collision end events
    pub fn collision_stopped(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.events.stopped_collisions()
    }

    /// Receive every collision event from now on
    pub fn subscribe_collisions(&mut self) -> Receiver<CollisionEvent> {
        self.events.subscribe()
    }

    /// Replay the last step's events into a handler
    pub fn dispatch_events(&self, handler: &mut dyn PhysicsEventHandler) {
        self.events.dispatch(handler);
    }

    // ==================== Debug ====================

    /// Counters from the last step
    pub fn stats(&self) -> PhysicsStats {
        self.stats
    }

    /// Get number of rigid bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Get number of awake dynamic bodies
    pub fn active_body_count(&self) -> usize {
        self.bodies
            .values()
            .filter(|b| !b.is_static() && !b.is_at_rest())
            .count()
    }

    /// Copy of the manifolds solved in the last step
    pub fn last_manifolds(&self) -> Vec<Manifold> {
        self.narrowphase.manifolds().lock().as_slice().to_vec()
    }

    /// Geometry for a debug renderer
    pub fn debug_snapshot(&self, flags: DebugDrawFlags) -> DebugSnapshot {
        let manifolds = self.narrowphase.manifolds().lock();
        DebugSnapshot::capture(
            flags,
            &self.bodies,
            manifolds.as_slice(),
            self.broadphase.debug_partitions(),
        )
    }
}
