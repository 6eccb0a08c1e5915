//! Collision events
//!
//! Every colliding pair produces one event per step: `Started` on the first
//! step it collides, `Persisted` while it keeps colliding and `Stopped` on
//! the first step it no longer does. Vetoed collisions are reported too,
//! flagged as such, with the single contact from the narrowphase test.
//!
//! Contact lists are recycled from step to step, so a steady scene records
//! its events without allocating.

use std::collections::HashSet;

use crossbeam_channel::{Receiver, Sender};
use impulse_math::Vec3;

use crate::body::BodyHandle;

/// Contact data from a collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactData {
    /// Contact point in world space
    pub point: Vec3,
    /// Contact normal (pointing from body_a to body_b)
    pub normal: Vec3,
    /// Signed penetration depth, `<= 0` while overlapping
    pub depth: f32,
    /// Normal impulse applied at this contact, `<= 0`
    pub impulse: f32,
}

/// Type of collision event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventType {
    /// Collision started this step
    Started,
    /// Collision continues from the previous step
    Persisted,
    /// Collision ended this step
    Stopped,
}

/// A collision event between two bodies
#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub event_type: CollisionEventType,
    /// A collision callback rejected the physical response
    pub vetoed: bool,
    /// Contact points (empty for stopped events)
    pub contacts: Vec<ContactData>,
}

impl CollisionEvent {
    pub fn is_started(&self) -> bool {
        self.event_type == CollisionEventType::Started
    }

    pub fn is_stopped(&self) -> bool {
        self.event_type == CollisionEventType::Stopped
    }

    /// Whether the event concerns `body`
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// Get the average contact point
    pub fn average_contact_point(&self) -> Option<Vec3> {
        if self.contacts.is_empty() {
            return None;
        }
        let sum = self.contacts.iter().fold(Vec3::ZERO, |acc, c| acc + c.point);
        Some(sum / self.contacts.len() as f32)
    }

    /// Get the average contact normal
    pub fn average_normal(&self) -> Option<Vec3> {
        let sum = self.contacts.iter().fold(Vec3::ZERO, |acc, c| acc + c.normal);
        sum.try_normalize(1e-4)
    }

    /// Get total impulse from all contacts
    pub fn total_impulse(&self) -> f32 {
        self.contacts.iter().map(|c| c.impulse).sum()
    }

    /// Deepest penetration among the contacts
    pub fn max_depth(&self) -> f32 {
        self.contacts.iter().map(|c| c.depth).fold(0.0, f32::min)
    }
}

/// Handler trait for physics events
pub trait PhysicsEventHandler {
    /// Called once per event, in step order
    fn on_collision(&mut self, event: &CollisionEvent);
}

impl<F: FnMut(&CollisionEvent)> PhysicsEventHandler for F {
    fn on_collision(&mut self, event: &CollisionEvent) {
        self(event)
    }
}

/// Per-step event buffer with pair tracking and channel fan-out
#[derive(Default)]
pub struct EventCollector {
    collision_events: Vec<CollisionEvent>,
    previous_pairs: HashSet<(BodyHandle, BodyHandle)>,
    current_pairs: HashSet<(BodyHandle, BodyHandle)>,
    /// Cleared contact lists from earlier steps
    spare_contacts: Vec<Vec<ContactData>>,
    stopped: Vec<(BodyHandle, BodyHandle)>,
    subscribers: Vec<Sender<CollisionEvent>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop last step's events and roll the pair sets over
    pub fn begin_step(&mut self) {
        for event in self.collision_events.drain(..) {
            let mut contacts = event.contacts;
            if contacts.capacity() > 0 {
                contacts.clear();
                self.spare_contacts.push(contacts);
            }
        }
        std::mem::swap(&mut self.previous_pairs, &mut self.current_pairs);
        self.current_pairs.clear();
    }

    /// Record a colliding pair, returning the index of its event
    pub fn record(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        vetoed: bool,
        contacts: impl IntoIterator<Item = ContactData>,
    ) -> usize {
        let mut buffer = self.spare_contacts.pop().unwrap_or_default();
        buffer.extend(contacts);
        let contacts = buffer;
        let key = (body_a, body_b);
        let event_type = if self.previous_pairs.contains(&key) {
            CollisionEventType::Persisted
        } else {
            CollisionEventType::Started
        };
        self.current_pairs.insert(key);
        self.collision_events.push(CollisionEvent {
            body_a,
            body_b,
            event_type,
            vetoed,
            contacts,
        });
        self.collision_events.len() - 1
    }

    /// Emit `Stopped` for pairs that collided last step but not this one,
    /// then publish the step's events to every live subscriber
    pub fn finish_step(&mut self) {
        self.stopped.clear();
        self.stopped
            .extend(self.previous_pairs.difference(&self.current_pairs).copied());
        self.stopped.sort_unstable();
        for &(body_a, body_b) in &self.stopped {
            self.collision_events.push(CollisionEvent {
                body_a,
                body_b,
                event_type: CollisionEventType::Stopped,
                vetoed: false,
                contacts: Vec::new(),
            });
        }

        if self.subscribers.is_empty() || self.collision_events.is_empty() {
            return;
        }
        let events = &self.collision_events;
        self.subscribers.retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
    }

    /// New unbounded channel receiving every event from now on
    pub fn subscribe(&mut self) -> Receiver<CollisionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn events(&self) -> &[CollisionEvent] {
        &self.collision_events
    }

    pub fn event_mut(&mut self, index: usize) -> Option<&mut CollisionEvent> {
        self.collision_events.get_mut(index)
    }

    /// Get collision start events
    pub fn started_collisions(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.collision_events.iter().filter(|e| e.is_started())
    }

    /// Get collision end events
    pub fn stopped_collisions(&self) -> impl Iterator<Item = &CollisionEvent> {
        self.collision_events.iter().filter(|e| e.is_stopped())
    }

    /// Replay this step's events into a handler
    pub fn dispatch(&self, handler: &mut dyn PhysicsEventHandler) {
        for event in &self.collision_events {
            handler.on_collision(event);
        }
    }

    /// Pairs colliding in the last completed step
    pub fn active_pairs(&self) -> usize {
        self.current_pairs.len()
    }

    /// Contact lists waiting to be reused
    pub fn spare_buffers(&self) -> usize {
        self.spare_contacts.len()
    }

    /// Forget every tracked pair and event
    pub fn clear(&mut self) {
        self.collision_events.clear();
        self.previous_pairs.clear();
        self.current_pairs.clear();
    }
}
