use std::time::Instant;

use glam::{Quat, Vec3};

use crate::collision::gjk::gjk_distance;
use crate::collision::toi::{time_of_impact, ToiState};
use crate::core::aabb::Aabb;
use crate::core::body::{BodyDef, BodyId, BodyType, RigidBody};
use crate::core::fixture::{Fixture, FixtureDef, FixtureId};
use crate::core::shape::Shape;
use crate::core::transform::Transform;
use crate::dynamics::contact::ContactId;
use crate::dynamics::contact_manager::ContactManager;
use crate::dynamics::island::{Island, IslandFlags};
use crate::dynamics::joints::{Joint, JointDef, JointId};
use crate::utils::arena::{Arena, Id};
use crate::utils::logging::ScopedTimer;
use crate::utils::profiling::StepProfile;
use crate::world::events::{
    CastHit, ContactFilter, ContactListener, DebugDraw, QueryFilter, QueryListener,
    RayCastFilter, RayCastListener, ShapeCastFilter, ShapeCastListener,
};

pub mod events;

fn fixture_user_data(id: FixtureId) -> u64 {
    ((id.generation() as u64) << 32) | id.index() as u64
}

fn fixture_from_user_data(data: u64) -> FixtureId {
    Id::new((data & 0xFFFF_FFFF) as u32, (data >> 32) as u32)
}

/// The simulation container: owns all bodies, fixtures, joints, contacts,
/// and broad-phase state, and drives the step pipeline.
pub struct World {
    pub(crate) bodies: Arena<RigidBody>,
    pub(crate) fixtures: Arena<Fixture>,
    pub(crate) joints: Arena<Joint>,
    pub(crate) contact_manager: ContactManager,

    gravity: Vec3,
    warm_starting: bool,
    sleeping: bool,
    new_fixtures: bool,
    debug_draw: Option<Box<dyn DebugDraw>>,

    pub profile: StepProfile,
}

impl World {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            bodies: Arena::new(),
            fixtures: Arena::new(),
            joints: Arena::new(),
            contact_manager: ContactManager::new(),
            gravity,
            warm_starting: true,
            sleeping: true,
            new_fixtures: false,
            debug_draw: None,
            profile: StepProfile::default(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn set_warm_starting(&mut self, flag: bool) {
        self.warm_starting = flag;
    }

    /// Enables or disables sleeping. Disabling wakes every body.
    pub fn set_sleeping(&mut self, flag: bool) {
        self.sleeping = flag;
        if !flag {
            for (_, body) in self.bodies.iter_mut() {
                body.set_awake(true);
            }
        }
    }

    pub fn set_contact_listener(&mut self, listener: Option<Box<dyn ContactListener>>) {
        self.contact_manager.listener = listener;
    }

    pub fn set_contact_filter(&mut self, filter: Option<Box<dyn ContactFilter>>) {
        self.contact_manager.filter = filter;
    }

    pub fn set_debug_draw(&mut self, drawer: Option<Box<dyn DebugDraw>>) {
        self.debug_draw = drawer;
    }

    /// Draws through the stored sink, if one is installed.
    pub fn draw_debug_data(&mut self, flags: u32) {
        if let Some(mut drawer) = self.debug_draw.take() {
            self.draw(drawer.as_mut(), flags);
            self.debug_draw = Some(drawer);
        }
    }

    // Bodies ------------------------------------------------------------

    pub fn create_body(&mut self, def: &BodyDef) -> BodyId {
        self.bodies.insert(RigidBody::new(def))
    }

    pub fn destroy_body(&mut self, id: BodyId) {
        let Some(body) = self.bodies.get(id) else {
            return;
        };

        for joint_id in body.joints.clone() {
            self.destroy_joint(joint_id);
        }
        let fixture_ids = self.bodies.get(id).map(|b| b.fixtures.clone()).unwrap_or_default();
        for fixture_id in fixture_ids {
            self.remove_fixture_internal(fixture_id, false);
        }
        self.bodies.remove(id);
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.ids()
    }

    /// Teleports a body, refreshing its sweep and broad-phase proxies.
    pub fn set_body_transform(&mut self, id: BodyId, position: Vec3, rotation: Quat) {
        let Some(body) = self.bodies.get_mut(id) else {
            return;
        };
        body.transform = Transform::new(position, rotation.normalize());
        let center = body.transform.transform_point(body.sweep.local_center);
        body.sweep.world_center = center;
        body.sweep.world_center0 = center;
        body.sweep.orientation = body.transform.rotation;
        body.sweep.orientation0 = body.transform.rotation;
        body.update_world_inertia();

        let transform = body.transform;
        for fixture_id in body.fixtures.clone() {
            let Some(fixture) = self.fixtures.get(fixture_id) else {
                continue;
            };
            let aabb = fixture.shape.compute_aabb(&transform);
            self.contact_manager
                .broad_phase
                .move_proxy(fixture.proxy, &aabb, Vec3::ZERO);
            self.contact_manager.broad_phase.touch_proxy(fixture.proxy);
        }
        self.new_fixtures = true;
    }

    // Fixtures ----------------------------------------------------------

    pub fn create_fixture(&mut self, body_id: BodyId, def: &FixtureDef) -> FixtureId {
        debug_assert!(self.bodies.contains(body_id));

        let fixture = Fixture::new(body_id, def);
        let fixture_id = self.fixtures.insert(fixture);

        let transform = self.bodies.get(body_id).expect("body").transform;
        let aabb = def.shape.compute_aabb(&transform);
        let proxy = self
            .contact_manager
            .broad_phase
            .create_proxy(&aabb, fixture_user_data(fixture_id));
        self.fixtures.get_mut(fixture_id).unwrap().proxy = proxy;

        let body = self.bodies.get_mut(body_id).expect("body");
        body.fixtures.push(fixture_id);

        if def.density > 0.0 {
            self.reset_mass(body_id);
        }
        self.new_fixtures = true;
        fixture_id
    }

    pub fn destroy_fixture(&mut self, id: FixtureId) {
        self.remove_fixture_internal(id, true);
    }

    fn remove_fixture_internal(&mut self, id: FixtureId, reset_mass: bool) {
        let Some(fixture) = self.fixtures.get(id) else {
            return;
        };
        let body_id = fixture.body;
        let proxy = fixture.proxy;
        let contact_ids = fixture.contacts.clone();

        for contact_id in contact_ids {
            self.contact_manager
                .destroy_contact(&mut self.bodies, &mut self.fixtures, contact_id);
        }

        self.contact_manager.broad_phase.destroy_proxy(proxy);
        self.fixtures.remove(id);

        if let Some(body) = self.bodies.get_mut(body_id) {
            body.fixtures.retain(|f| *f != id);
        }
        if reset_mass {
            self.reset_mass(body_id);
        }
    }

    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.get(id)
    }

    pub fn fixture_mut(&mut self, id: FixtureId) -> Option<&mut Fixture> {
        self.fixtures.get_mut(id)
    }

    /// Recomputes a body's mass, center, and inertia from its fixtures.
    pub fn reset_mass(&mut self, body_id: BodyId) {
        let Some(body) = self.bodies.get(body_id) else {
            return;
        };
        let mut mass = 0.0_f32;
        let mut center = Vec3::ZERO;
        let mut inertia = glam::Mat3::ZERO;

        for fixture_id in &body.fixtures {
            let Some(fixture) = self.fixtures.get(*fixture_id) else {
                continue;
            };
            if fixture.density == 0.0 {
                continue;
            }
            let data = fixture.shape.mass_data(fixture.density);
            mass += data.mass;
            center += data.mass * data.center;
            inertia += data.inertia;
        }

        if mass > 0.0 {
            center /= mass;
        }

        self.bodies
            .get_mut(body_id)
            .unwrap()
            .set_mass_from_fixtures(mass, center, inertia);
    }

    // Joints ------------------------------------------------------------

    pub fn create_joint(&mut self, def: &JointDef) -> JointId {
        let (body_a, body_b) = def.bodies();
        debug_assert!(self.bodies.contains(body_a) && self.bodies.contains(body_b));
        debug_assert!(
            self.bodies.get(body_a).map(|b| b.is_dynamic()).unwrap_or(false)
                || self.bodies.get(body_b).map(|b| b.is_dynamic()).unwrap_or(false),
            "a joint needs at least one dynamic body"
        );

        let xf_a = self.bodies.get(body_a).expect("joint body a").transform;
        let xf_b = self.bodies.get(body_b).expect("joint body b").transform;
        let joint = Joint::from_def(def, &xf_a, &xf_b);
        let joint_id = self.joints.insert(joint);

        self.bodies.get_mut(body_a).unwrap().joints.push(joint_id);
        self.bodies.get_mut(body_b).unwrap().joints.push(joint_id);

        // Existing contacts between the bodies get re-filtered on the next
        // update; wake the pair so that happens promptly.
        for id in [body_a, body_b] {
            if let Some(body) = self.bodies.get_mut(id) {
                body.set_awake(true);
            }
        }
        joint_id
    }

    pub fn destroy_joint(&mut self, id: JointId) {
        let Some(joint) = self.joints.remove(id) else {
            return;
        };
        for body_id in [joint.body_a, joint.body_b] {
            if let Some(body) = self.bodies.get_mut(body_id) {
                body.joints.retain(|j| *j != id);
                body.set_awake(true);
            }
        }
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id)
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut Joint> {
        self.joints.get_mut(id)
    }

    // Contacts ----------------------------------------------------------

    pub fn contact(&self, id: ContactId) -> Option<&crate::dynamics::contact::Contact> {
        self.contact_manager.contacts.get(id)
    }

    pub fn contact_ids(&self) -> Vec<ContactId> {
        self.contact_manager.contacts.ids()
    }

    pub fn contact_count(&self) -> usize {
        self.contact_manager.contacts.len()
    }

    // Stepping ----------------------------------------------------------

    /// Advances the world by `dt` seconds. The step is atomic: callbacks
    /// observe a consistent world and must not mutate it.
    pub fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        let _timer = ScopedTimer::new("world::step");
        let step_start = Instant::now();
        self.profile.reset();

        // New fixtures need pairs before the narrow phase can see them.
        if self.new_fixtures {
            self.find_new_contacts();
            self.new_fixtures = false;
        }

        let narrow_start = Instant::now();
        self.contact_manager.update_contacts(
            &mut self.bodies,
            &mut self.fixtures,
            &self.joints,
            self.warm_starting,
        );
        self.profile.narrow_phase_time = narrow_start.elapsed();

        if dt > 0.0 {
            let solver_start = Instant::now();
            self.solve(dt, velocity_iterations, position_iterations);
            self.profile.solver_time = solver_start.elapsed();
        }

        self.profile.body_count = self.bodies.len();
        self.profile.contact_count = self.contact_manager.contacts.len();
        self.profile.total_step_time = step_start.elapsed();
    }

    /// Builds islands over the awake constraint graph and solves each.
    fn solve(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        for (_, body) in self.bodies.iter_mut() {
            body.island_flag = false;
        }
        for (_, contact) in self.contact_manager.contacts.iter_mut() {
            contact.island_flag = false;
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.island_flag = false;
        }

        let flags = IslandFlags {
            warm_starting: self.warm_starting,
            allow_sleep: self.sleeping,
        };

        let mut island = Island::with_capacity(
            self.bodies.len(),
            self.contact_manager.contacts.len(),
            self.joints.len(),
        );
        let mut stack: Vec<BodyId> = Vec::with_capacity(self.bodies.len());
        let mut island_count = 0;

        for seed_id in self.bodies.ids() {
            {
                let seed = self.bodies.get(seed_id).unwrap();
                if seed.island_flag
                    || !seed.is_awake()
                    || seed.body_type == BodyType::Static
                {
                    continue;
                }
            }

            island.clear();
            stack.clear();
            stack.push(seed_id);
            self.bodies.get_mut(seed_id).unwrap().island_flag = true;

            while let Some(body_id) = stack.pop() {
                island.bodies.push(body_id);

                let body = self.bodies.get_mut(body_id).unwrap();
                body.set_awake(true);

                // Static bodies bound islands but do not join them up.
                if body.body_type == BodyType::Static {
                    continue;
                }

                let fixture_ids = body.fixtures.clone();
                let joint_ids = body.joints.clone();

                for fixture_id in fixture_ids {
                    let contact_ids = self
                        .fixtures
                        .get(fixture_id)
                        .map(|f| f.contacts.clone())
                        .unwrap_or_default();
                    for contact_id in contact_ids {
                        let Some(contact) = self.contact_manager.contacts.get(contact_id) else {
                            continue;
                        };
                        if contact.island_flag || !contact.overlapping {
                            continue;
                        }
                        let fa = self.fixtures.get(contact.fixture_a).unwrap();
                        let fb = self.fixtures.get(contact.fixture_b).unwrap();
                        if fa.is_sensor || fb.is_sensor {
                            continue;
                        }
                        let dynamic = self.bodies.get(fa.body).map(|b| b.is_dynamic()).unwrap_or(false)
                            || self.bodies.get(fb.body).map(|b| b.is_dynamic()).unwrap_or(false);
                        if !dynamic {
                            continue;
                        }
                        if let Some(filter) = &self.contact_manager.filter {
                            if !filter.should_respond(fa, fb) {
                                continue;
                            }
                        }

                        let other_body = if fa.body == body_id { fb.body } else { fa.body };
                        self.contact_manager
                            .contacts
                            .get_mut(contact_id)
                            .unwrap()
                            .island_flag = true;
                        island.contacts.push(contact_id);

                        let other = self.bodies.get_mut(other_body).unwrap();
                        if !other.island_flag {
                            other.island_flag = true;
                            stack.push(other_body);
                        }
                    }
                }

                for joint_id in joint_ids {
                    let Some(joint) = self.joints.get_mut(joint_id) else {
                        continue;
                    };
                    if joint.island_flag {
                        continue;
                    }
                    joint.island_flag = true;
                    let other_body = if joint.body_a == body_id {
                        joint.body_b
                    } else {
                        joint.body_a
                    };
                    island.joints.push(joint_id);

                    let other = self.bodies.get_mut(other_body).unwrap();
                    if !other.island_flag {
                        other.island_flag = true;
                        stack.push(other_body);
                    }
                }
            }

            island.solve(
                &mut self.bodies,
                &self.fixtures,
                &mut self.contact_manager.contacts,
                &mut self.joints,
                self.gravity,
                dt,
                velocity_iterations,
                position_iterations,
                flags,
            );
            island_count += 1;

            // Post-solve report with the stored impulses.
            if let Some(listener) = self.contact_manager.listener.as_mut() {
                for contact_id in &island.contacts {
                    if let Some(contact) = self.contact_manager.contacts.get(*contact_id) {
                        listener.post_solve(
                            *contact_id,
                            contact.fixture_a,
                            contact.fixture_b,
                            &contact.manifolds,
                        );
                    }
                }
            }

            // Static bodies may participate in several islands.
            for body_id in &island.bodies {
                let body = self.bodies.get_mut(*body_id).unwrap();
                if body.body_type == BodyType::Static {
                    body.island_flag = false;
                }
            }
        }
        self.profile.island_count = island_count;

        let broad_start = Instant::now();
        self.synchronize_fixtures();
        self.find_new_contacts();
        self.profile.broad_phase_time = broad_start.elapsed();
    }

    /// Moves the broad-phase proxies of every body that took part in an
    /// island, with swept AABBs covering the whole step.
    fn synchronize_fixtures(&mut self) {
        for body_id in self.bodies.ids() {
            let body = self.bodies.get(body_id).unwrap();
            if !body.island_flag || body.body_type == BodyType::Static {
                continue;
            }

            let xf0 = body.sweep.transform(0.0);
            let xf1 = body.transform;
            let displacement = xf1.position - xf0.position;
            let fixture_ids = body.fixtures.clone();

            for fixture_id in fixture_ids {
                let Some(fixture) = self.fixtures.get(fixture_id) else {
                    continue;
                };
                let aabb0 = fixture.shape.compute_aabb(&xf0);
                let aabb1 = fixture.shape.compute_aabb(&xf1);
                let swept = Aabb::combine(&aabb0, &aabb1);
                self.contact_manager
                    .broad_phase
                    .move_proxy(fixture.proxy, &swept, displacement);
            }
        }

        // Mesh contacts track the convex side in the mesh's own frame.
        for contact_id in self.contact_manager.contacts.ids() {
            let contact = self.contact_manager.contacts.get(contact_id).unwrap();
            if contact.mesh.is_none() {
                continue;
            }
            let (fa, fb) = (contact.fixture_a, contact.fixture_b);
            let (Some(fixture_a), Some(fixture_b)) =
                (self.fixtures.get(fa), self.fixtures.get(fb))
            else {
                continue;
            };
            let body_a = self.bodies.get(fixture_a.body).unwrap();
            let body_b = self.bodies.get(fixture_b.body).unwrap();
            let displacement = body_b.sweep.world_center - body_b.sweep.world_center0;
            let shape_a = fixture_a.shape.clone();
            let shape_b = fixture_b.shape.clone();
            let (xf_a, xf_b) = (body_a.transform, body_b.transform);

            let contact = self.contact_manager.contacts.get_mut(contact_id).unwrap();
            contact.synchronize_mesh(&shape_a, &xf_a, &shape_b, &xf_b, displacement);
            contact.find_mesh_pairs(&shape_a);
        }
    }

    /// Queries the move buffer for fresh broad-phase pairs and admits them.
    fn find_new_contacts(&mut self) {
        let pairs = self.contact_manager.broad_phase.find_pairs();
        self.profile.pair_count += pairs.len();
        for (proxy_a, proxy_b) in pairs {
            let id_a = fixture_from_user_data(self.contact_manager.broad_phase.user_data(proxy_a));
            let id_b = fixture_from_user_data(self.contact_manager.broad_phase.user_data(proxy_b));
            self.contact_manager.add_pair(
                &mut self.bodies,
                &mut self.fixtures,
                &self.joints,
                id_a,
                id_b,
            );
        }

        // Fresh mesh contacts query their triangles before the narrow
        // phase needs them.
        for contact_id in self.contact_manager.contacts.ids() {
            let contact = self.contact_manager.contacts.get(contact_id).unwrap();
            if contact.mesh.is_none() {
                continue;
            }
            let (Some(fixture_a), Some(fixture_b)) = (
                self.fixtures.get(contact.fixture_a),
                self.fixtures.get(contact.fixture_b),
            ) else {
                continue;
            };
            let shape_a = fixture_a.shape.clone();
            let shape_b = fixture_b.shape.clone();
            let xf_a = self.bodies.get(fixture_a.body).unwrap().transform;
            let xf_b = self.bodies.get(fixture_b.body).unwrap().transform;

            let contact = self.contact_manager.contacts.get_mut(contact_id).unwrap();
            contact.synchronize_mesh(&shape_a, &xf_a, &shape_b, &xf_b, Vec3::ZERO);
            contact.find_mesh_pairs(&shape_a);
        }
    }

    // Queries -----------------------------------------------------------

    /// Reports every fixture whose fat AABB overlaps `aabb`.
    pub fn query_aabb(
        &self,
        listener: &mut dyn QueryListener,
        filter: Option<&dyn QueryFilter>,
        aabb: &Aabb,
    ) {
        self.contact_manager.broad_phase.tree.query(aabb, |leaf| {
            let id = fixture_from_user_data(self.contact_manager.broad_phase.user_data(leaf));
            if let Some(fixture) = self.fixtures.get(id) {
                if let Some(filter) = filter {
                    if !filter.should_report(fixture) {
                        return true;
                    }
                }
                return listener.report_fixture(id);
            }
            true
        });
    }

    /// Casts a segment through the world, reporting every fixture hit.
    /// The listener's return value shortens the ray.
    pub fn ray_cast(
        &self,
        listener: &mut dyn RayCastListener,
        filter: Option<&dyn RayCastFilter>,
        p1: Vec3,
        p2: Vec3,
    ) {
        self.contact_manager
            .broad_phase
            .tree
            .ray_cast(p1, p2, |leaf, max_fraction| {
                let id =
                    fixture_from_user_data(self.contact_manager.broad_phase.user_data(leaf));
                let Some(fixture) = self.fixtures.get(id) else {
                    return max_fraction;
                };
                if let Some(filter) = filter {
                    if !filter.should_ray_cast(fixture) {
                        return max_fraction;
                    }
                }
                let body = self.bodies.get(fixture.body).expect("fixture body");
                match fixture.shape.ray_cast(&body.transform, p1, p2, max_fraction) {
                    Some(hit) => {
                        let point = p1 + hit.fraction * (p2 - p1);
                        listener.report_fixture(id, point, hit.normal, hit.fraction)
                    }
                    None => max_fraction,
                }
            });
    }

    /// Nearest-hit ray cast.
    pub fn ray_cast_single(
        &self,
        filter: Option<&dyn RayCastFilter>,
        p1: Vec3,
        p2: Vec3,
    ) -> Option<CastHit> {
        struct Nearest {
            hit: Option<CastHit>,
        }
        impl RayCastListener for Nearest {
            fn report_fixture(
                &mut self,
                fixture: FixtureId,
                point: Vec3,
                normal: Vec3,
                fraction: f32,
            ) -> f32 {
                self.hit = Some(CastHit {
                    fixture,
                    point,
                    normal,
                    fraction,
                });
                // Clip the ray to the hit: anything farther is hidden.
                fraction
            }
        }

        let mut nearest = Nearest { hit: None };
        self.ray_cast(&mut nearest, filter, p1, p2);
        nearest.hit
    }

    /// Sweeps a convex shape through the world along `displacement`,
    /// reporting conservative time-of-impact hits.
    pub fn shape_cast(
        &self,
        listener: &mut dyn ShapeCastListener,
        filter: Option<&dyn ShapeCastFilter>,
        shape: &Shape,
        xf: &Transform,
        displacement: Vec3,
    ) {
        debug_assert!(
            !matches!(shape, Shape::Mesh { .. }),
            "shape casts require a convex shape"
        );
        if matches!(shape, Shape::Mesh { .. }) {
            return;
        }

        let mut swept = shape.compute_aabb(xf);
        swept.extend_towards(displacement);

        let proxy_a = shape.gjk_proxy(0);
        let mut max_fraction = 1.0_f32;

        let mut leaves = Vec::new();
        self.contact_manager.broad_phase.tree.query(&swept, |leaf| {
            leaves.push(leaf);
            true
        });

        'leaves: for leaf in leaves {
            let id = fixture_from_user_data(self.contact_manager.broad_phase.user_data(leaf));
            let Some(fixture) = self.fixtures.get(id) else {
                continue;
            };
            if let Some(filter) = filter {
                if !filter.should_shape_cast(fixture) {
                    continue;
                }
            }
            let body = self.bodies.get(fixture.body).expect("fixture body");
            let xf_b = body.transform;

            // Meshes descend to candidate triangles first.
            let children: Vec<u32> = match &fixture.shape {
                Shape::Mesh { mesh, scale, .. } => {
                    let local = xf_b.mul_transpose(xf);
                    let mut aabb = shape.compute_aabb(&local);
                    aabb.scale(Vec3::splat(1.0 / *scale));
                    let local_displacement = xf_b.inverse_transform_vector(displacement) / *scale;
                    aabb.extend_towards(local_displacement);

                    let mut triangles = Vec::new();
                    mesh.bvh().query(&aabb, |t| {
                        triangles.push(t);
                        true
                    });
                    triangles
                }
                _ => vec![0],
            };

            for child in children {
                let proxy_b = fixture.shape.gjk_proxy(child);
                let toi = time_of_impact(
                    xf,
                    &proxy_a,
                    displacement,
                    &xf_b,
                    &proxy_b,
                    Vec3::ZERO,
                    max_fraction,
                );
                if toi.state != ToiState::Touching {
                    continue;
                }
                if toi.t > max_fraction {
                    continue;
                }

                // Witness point and normal at the impact time.
                let xf_t = Transform::new(xf.position + toi.t * displacement, xf.rotation);
                let query = gjk_distance(&xf_t, &proxy_a, &xf_b, &proxy_b, false, None);
                let normal = (query.point_b - query.point_a).normalize_or_zero();
                let point = query.point_b + proxy_b.radius * normal;

                max_fraction = listener.report_fixture(id, point, normal, toi.t);
                if max_fraction == 0.0 {
                    break 'leaves;
                }
            }
        }
    }

    /// Nearest-hit shape cast. A failed TOI root find surfaces as
    /// "no hit".
    pub fn shape_cast_single(
        &self,
        filter: Option<&dyn ShapeCastFilter>,
        shape: &Shape,
        xf: &Transform,
        displacement: Vec3,
    ) -> Option<CastHit> {
        struct Nearest {
            hit: Option<CastHit>,
        }
        impl ShapeCastListener for Nearest {
            fn report_fixture(
                &mut self,
                fixture: FixtureId,
                point: Vec3,
                normal: Vec3,
                fraction: f32,
            ) -> f32 {
                self.hit = Some(CastHit {
                    fixture,
                    point,
                    normal,
                    fraction,
                });
                fraction
            }
        }

        let mut nearest = Nearest { hit: None };
        self.shape_cast(&mut nearest, filter, shape, xf, displacement);
        nearest.hit
    }

    // Debug draw --------------------------------------------------------

    /// Pushes the world state into a debug drawer.
    pub fn draw(&self, draw: &mut dyn DebugDraw, flags: u32) {
        use events::draw_flags;

        if flags & draw_flags::CENTERS_OF_MASS != 0 {
            for (_, body) in self.bodies.iter() {
                let xf = Transform::new(body.sweep.world_center, body.sweep.orientation);
                draw.draw_transform(&xf);
            }
        }

        if flags & draw_flags::SHAPES != 0 {
            for (_, body) in self.bodies.iter() {
                let color = if !body.is_awake() {
                    [0.5, 0.25, 0.25, 1.0]
                } else {
                    match body.body_type {
                        BodyType::Static => [0.5, 0.5, 0.5, 1.0],
                        BodyType::Kinematic => [0.5, 0.5, 1.0, 1.0],
                        BodyType::Dynamic => [1.0, 0.5, 0.5, 1.0],
                    }
                };
                for fixture_id in &body.fixtures {
                    if let Some(fixture) = self.fixtures.get(*fixture_id) {
                        self.draw_shape(draw, &fixture.shape, &body.transform, color);
                    }
                }
            }
        }

        if flags & draw_flags::AABBS != 0 {
            for (_, fixture) in self.fixtures.iter() {
                let aabb = self.contact_manager.broad_phase.fat_aabb(fixture.proxy);
                draw.draw_aabb(aabb, [1.0, 0.75, 0.8, 1.0]);
            }
        }

        if flags & draw_flags::JOINTS != 0 {
            for (_, joint) in self.joints.iter() {
                let (Some(body_a), Some(body_b)) =
                    (self.bodies.get(joint.body_a), self.bodies.get(joint.body_b))
                else {
                    continue;
                };
                draw.draw_segment(
                    body_a.sweep.world_center,
                    body_b.sweep.world_center,
                    [0.8, 0.8, 0.8, 1.0],
                );
            }
        }

        if flags & (draw_flags::CONTACT_POINTS | draw_flags::CONTACT_NORMALS) != 0 {
            for (_, contact) in self.contact_manager.contacts.iter() {
                let (Some(fixture_a), Some(fixture_b)) = (
                    self.fixtures.get(contact.fixture_a),
                    self.fixtures.get(contact.fixture_b),
                ) else {
                    continue;
                };
                let xf_a = self.bodies.get(fixture_a.body).unwrap().transform;
                let xf_b = self.bodies.get(fixture_b.body).unwrap().transform;

                for manifold in &contact.manifolds {
                    let projected = crate::collision::manifold::WorldManifold::initialize(
                        manifold,
                        &xf_a,
                        fixture_a.shape.radius(),
                        &xf_b,
                        fixture_b.shape.radius(),
                    );
                    for (point, manifold_point) in
                        projected.points.iter().zip(manifold.points.iter())
                    {
                        if flags & draw_flags::CONTACT_POINTS != 0 {
                            let color = if manifold_point.persist_count > 0 {
                                [0.0, 1.0, 0.0, 1.0]
                            } else {
                                [1.0, 0.0, 0.0, 1.0]
                            };
                            draw.draw_point(point.point, 4.0, color);
                        }
                        if flags & draw_flags::CONTACT_NORMALS != 0 {
                            draw.draw_segment(
                                point.point,
                                point.point + projected.normal,
                                [1.0, 1.0, 1.0, 1.0],
                            );
                        }
                    }
                }
            }
        }
    }

    fn draw_shape(&self, draw: &mut dyn DebugDraw, shape: &Shape, xf: &Transform, color: [f32; 4]) {
        match shape {
            Shape::Sphere { center, radius } => {
                draw.draw_sphere(xf.transform_point(*center), *radius, color);
            }
            Shape::Capsule {
                point1,
                point2,
                radius,
            } => {
                draw.draw_capsule(
                    xf.transform_point(*point1),
                    xf.transform_point(*point2),
                    *radius,
                    color,
                );
            }
            Shape::Triangle { v1, v2, v3, .. } => {
                draw.draw_triangle(
                    xf.transform_point(*v1),
                    xf.transform_point(*v2),
                    xf.transform_point(*v3),
                    color,
                );
            }
            Shape::Hull { hull, .. } => {
                for face in 0..hull.faces.len() as u32 {
                    let vertices: Vec<Vec3> = hull
                        .face_vertices(face)
                        .into_iter()
                        .map(|v| xf.transform_point(v))
                        .collect();
                    let normal = xf.transform_vector(hull.planes[face as usize].normal);
                    draw.draw_solid_polygon(normal, &vertices, color);
                }
            }
            Shape::Cylinder {
                half_height,
                cylinder_radius,
                ..
            } => {
                draw.draw_cylinder(
                    xf.transform_point(Vec3::new(0.0, -*half_height, 0.0)),
                    xf.transform_point(Vec3::new(0.0, *half_height, 0.0)),
                    *cylinder_radius,
                    color,
                );
            }
            Shape::Mesh { mesh, scale, .. } => {
                for triangle in 0..mesh.triangles.len() as u32 {
                    let (a, b, c) = mesh.triangle_vertices(triangle);
                    draw.draw_triangle(
                        xf.transform_point(a * *scale),
                        xf.transform_point(b * *scale),
                        xf.transform_point(c * *scale),
                        color,
                    );
                }
            }
        }
    }
}
