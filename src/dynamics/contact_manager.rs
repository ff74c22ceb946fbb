use crate::collision::broadphase::BroadPhase;
use crate::core::body::{BodyType, RigidBody};
use crate::core::fixture::{Fixture, FixtureId};
use crate::utils::arena::Arena;
use crate::world::events::{ContactFilter, ContactListener};

use super::contact::{dispatch_order, mix_friction, mix_restitution, Contact, ContactId};
use super::joints::Joint;

/// Owns the contact graph: creates contacts for new broad-phase pairs,
/// retires stale ones, and drives narrow-phase updates and events.
pub struct ContactManager {
    pub broad_phase: BroadPhase,
    pub contacts: Arena<Contact>,
    pub listener: Option<Box<dyn ContactListener>>,
    pub filter: Option<Box<dyn ContactFilter>>,
}

impl Default for ContactManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactManager {
    pub fn new() -> Self {
        Self {
            broad_phase: BroadPhase::new(),
            contacts: Arena::new(),
            listener: None,
            filter: None,
        }
    }

    /// Whether body-level rules allow a collision: not the same body, at
    /// least one non-static, and no joint forbidding linked collision.
    fn bodies_should_collide(
        bodies: &Arena<RigidBody>,
        joints: &Arena<Joint>,
        fixture_a: &Fixture,
        fixture_b: &Fixture,
    ) -> bool {
        if fixture_a.body == fixture_b.body {
            return false;
        }
        let body_a = match bodies.get(fixture_a.body) {
            Some(b) => b,
            None => return false,
        };
        let body_b = match bodies.get(fixture_b.body) {
            Some(b) => b,
            None => return false,
        };

        if body_a.body_type == BodyType::Static && body_b.body_type == BodyType::Static {
            return false;
        }

        for joint_id in &body_a.joints {
            if let Some(joint) = joints.get(*joint_id) {
                let other = if joint.body_a == fixture_a.body {
                    joint.body_b
                } else {
                    joint.body_a
                };
                if other == fixture_b.body && !joint.collide_linked {
                    return false;
                }
            }
        }
        true
    }

    /// Admits one broad-phase pair into the contact graph.
    pub fn add_pair(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        fixtures: &mut Arena<Fixture>,
        joints: &Arena<Joint>,
        id_a: FixtureId,
        id_b: FixtureId,
    ) {
        let (Some(fixture_a), Some(fixture_b)) = (fixtures.get(id_a), fixtures.get(id_b)) else {
            return;
        };

        // A contact may already join these fixtures.
        for contact_id in &fixture_b.contacts {
            if let Some(contact) = self.contacts.get(*contact_id) {
                if (contact.fixture_a == id_a && contact.fixture_b == id_b)
                    || (contact.fixture_a == id_b && contact.fixture_b == id_a)
                {
                    return;
                }
            }
        }

        if !Self::bodies_should_collide(bodies, joints, fixture_a, fixture_b) {
            return;
        }
        if let Some(filter) = &self.filter {
            if !filter.should_collide(fixture_a, fixture_b) {
                return;
            }
        }

        // Canonical dispatch order; unsupported pairs never get a contact.
        let kind_a = fixture_a.shape.kind();
        let kind_b = fixture_b.shape.kind();
        let (first, second) = match dispatch_order(kind_a, kind_b) {
            Some(false) => (id_a, id_b),
            Some(true) => (id_b, id_a),
            None => return,
        };

        let shape_first = &fixtures.get(first).unwrap().shape;
        let friction = mix_friction(fixture_a.friction, fixture_b.friction);
        let restitution = mix_restitution(fixture_a.restitution, fixture_b.restitution);
        let sensor = fixture_a.is_sensor || fixture_b.is_sensor;

        let contact = Contact::new(first, second, shape_first, friction, restitution);
        let contact_id = self.contacts.insert(contact);

        fixtures.get_mut(first).unwrap().contacts.push(contact_id);
        fixtures.get_mut(second).unwrap().contacts.push(contact_id);

        if !sensor {
            let body_a = fixtures.get(first).unwrap().body;
            let body_b = fixtures.get(second).unwrap().body;
            if let Some(body) = bodies.get_mut(body_a) {
                body.set_awake(true);
            }
            if let Some(body) = bodies.get_mut(body_b) {
                body.set_awake(true);
            }
        }
    }

    /// Removes a contact, unlinking the fixture edges and reporting
    /// `end_contact` when it was overlapping.
    pub fn destroy_contact(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        fixtures: &mut Arena<Fixture>,
        contact_id: ContactId,
    ) {
        let Some(contact) = self.contacts.remove(contact_id) else {
            return;
        };

        if contact.overlapping {
            if let Some(listener) = self.listener.as_mut() {
                listener.end_contact(contact_id, contact.fixture_a, contact.fixture_b);
            }
            // Waking on separation keeps stacks from freezing mid-air.
            let sensor = [contact.fixture_a, contact.fixture_b]
                .iter()
                .any(|id| fixtures.get(*id).map(|f| f.is_sensor).unwrap_or(false));
            if !sensor {
                for id in [contact.fixture_a, contact.fixture_b] {
                    if let Some(fixture) = fixtures.get(id) {
                        if let Some(body) = bodies.get_mut(fixture.body) {
                            body.set_awake(true);
                        }
                    }
                }
            }
        }

        for id in [contact.fixture_a, contact.fixture_b] {
            if let Some(fixture) = fixtures.get_mut(id) {
                fixture.contacts.retain(|c| *c != contact_id);
            }
        }
    }

    /// Narrow-phase pass over every live contact: destroy the ones whose
    /// pair rules or broad-phase overlap lapsed, regenerate manifolds for
    /// the rest, and report transitions.
    pub fn update_contacts(
        &mut self,
        bodies: &mut Arena<RigidBody>,
        fixtures: &mut Arena<Fixture>,
        joints: &Arena<Joint>,
        warm_starting: bool,
    ) {
        let ids = self.contacts.ids();
        for contact_id in ids {
            let contact = match self.contacts.get(contact_id) {
                Some(c) => c,
                None => continue,
            };
            let (id_a, id_b) = (contact.fixture_a, contact.fixture_b);
            let (Some(fixture_a), Some(fixture_b)) = (fixtures.get(id_a), fixtures.get(id_b))
            else {
                self.destroy_contact(bodies, fixtures, contact_id);
                continue;
            };

            if !Self::bodies_should_collide(bodies, joints, fixture_a, fixture_b) {
                self.destroy_contact(bodies, fixtures, contact_id);
                continue;
            }
            if let Some(filter) = &self.filter {
                if !filter.should_collide(fixture_a, fixture_b) {
                    self.destroy_contact(bodies, fixtures, contact_id);
                    continue;
                }
            }

            let body_a = bodies.get(fixture_a.body).expect("fixture body");
            let body_b = bodies.get(fixture_b.body).expect("fixture body");

            // Both sides inert: leave the contact as-is.
            let active_a = body_a.is_awake() && body_a.body_type != BodyType::Static;
            let active_b = body_b.is_awake() && body_b.body_type != BodyType::Static;
            if !active_a && !active_b {
                continue;
            }

            // Broad-phase boxes drifted apart: retire the contact.
            if !self
                .broad_phase
                .test_overlap(fixture_a.proxy, fixture_b.proxy)
            {
                self.destroy_contact(bodies, fixtures, contact_id);
                continue;
            }

            let xf_a = body_a.transform;
            let xf_b = body_b.transform;
            let shape_a = fixture_a.shape.clone();
            let shape_b = fixture_b.shape.clone();
            let is_sensor = fixture_a.is_sensor || fixture_b.is_sensor;
            let is_dynamic = body_a.is_dynamic() || body_b.is_dynamic();
            let (body_id_a, body_id_b) = (fixture_a.body, fixture_b.body);

            let contact = self.contacts.get_mut(contact_id).unwrap();
            let was_overlapping = contact.overlapping;

            let is_overlapping = if is_sensor {
                contact.manifolds.clear();
                contact.test_overlap(&shape_a, &xf_a, &shape_b, &xf_b)
            } else {
                contact.evaluate(&shape_a, &xf_a, &shape_b, &xf_b, warm_starting);
                contact.point_count() > 0
            };
            contact.overlapping = is_overlapping;

            if is_overlapping != was_overlapping {
                for body_id in [body_id_a, body_id_b] {
                    if let Some(body) = bodies.get_mut(body_id) {
                        body.set_awake(true);
                    }
                }
            }

            if let Some(listener) = self.listener.as_mut() {
                if !was_overlapping && is_overlapping {
                    listener.begin_contact(contact_id, id_a, id_b);
                }
                if was_overlapping && !is_overlapping {
                    listener.end_contact(contact_id, id_a, id_b);
                }
                if is_overlapping && is_dynamic && !is_sensor {
                    let contact = self.contacts.get(contact_id).unwrap();
                    listener.pre_solve(contact_id, id_a, id_b, &contact.manifolds);
                }
            }
        }
    }
}
