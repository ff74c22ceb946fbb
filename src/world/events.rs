use glam::Vec3;

use crate::collision::manifold::Manifold;
use crate::core::aabb::Aabb;
use crate::core::fixture::{Fixture, FixtureId};
use crate::core::transform::Transform;
use crate::dynamics::contact::ContactId;

/// Contact lifecycle callbacks. Listeners receive ids and data views and
/// must not mutate the world; deferred creates/destroys happen after
/// `step` returns.
pub trait ContactListener {
    /// The two fixtures started overlapping.
    fn begin_contact(&mut self, contact: ContactId, fixture_a: FixtureId, fixture_b: FixtureId) {
        let _ = (contact, fixture_a, fixture_b);
    }

    /// The two fixtures stopped overlapping (or the contact died).
    fn end_contact(&mut self, contact: ContactId, fixture_a: FixtureId, fixture_b: FixtureId) {
        let _ = (contact, fixture_a, fixture_b);
    }

    /// Fresh manifolds exist but the solver has not run yet.
    fn pre_solve(
        &mut self,
        contact: ContactId,
        fixture_a: FixtureId,
        fixture_b: FixtureId,
        manifolds: &[Manifold],
    ) {
        let _ = (contact, fixture_a, fixture_b, manifolds);
    }

    /// The solver finished; manifold points carry the applied impulses.
    fn post_solve(
        &mut self,
        contact: ContactId,
        fixture_a: FixtureId,
        fixture_b: FixtureId,
        manifolds: &[Manifold],
    ) {
        let _ = (contact, fixture_a, fixture_b, manifolds);
    }
}

/// Application-level collision filtering.
pub trait ContactFilter {
    /// Whether a contact should be created at all.
    fn should_collide(&self, fixture_a: &Fixture, fixture_b: &Fixture) -> bool {
        let _ = (fixture_a, fixture_b);
        true
    }

    /// Whether an existing contact may produce impulses this step.
    fn should_respond(&self, fixture_a: &Fixture, fixture_b: &Fixture) -> bool {
        let _ = (fixture_a, fixture_b);
        true
    }
}

/// AABB query callbacks; return `false` to stop the query.
pub trait QueryListener {
    fn report_fixture(&mut self, fixture: FixtureId) -> bool;
}

pub trait QueryFilter {
    fn should_report(&self, fixture: &Fixture) -> bool {
        let _ = fixture;
        true
    }
}

/// Ray cast callbacks. The return value becomes the new max fraction:
/// return the given fraction to keep searching, something smaller to clip
/// the ray, or 0 to stop.
pub trait RayCastListener {
    fn report_fixture(
        &mut self,
        fixture: FixtureId,
        point: Vec3,
        normal: Vec3,
        fraction: f32,
    ) -> f32;
}

pub trait RayCastFilter {
    fn should_ray_cast(&self, fixture: &Fixture) -> bool {
        let _ = fixture;
        true
    }
}

/// Shape cast callbacks, mirroring the ray cast contract.
pub trait ShapeCastListener {
    fn report_fixture(
        &mut self,
        fixture: FixtureId,
        point: Vec3,
        normal: Vec3,
        fraction: f32,
    ) -> f32;
}

pub trait ShapeCastFilter {
    fn should_shape_cast(&self, fixture: &Fixture) -> bool {
        let _ = fixture;
        true
    }
}

/// Nearest-hit output of the single-result queries.
#[derive(Debug, Clone, Copy)]
pub struct CastHit {
    pub fixture: FixtureId,
    pub point: Vec3,
    pub normal: Vec3,
    pub fraction: f32,
}

/// Debug drawing sink. The world pushes primitives on demand and stores
/// no frame-to-frame state.
pub trait DebugDraw {
    fn draw_point(&mut self, point: Vec3, size: f32, color: [f32; 4]);
    fn draw_segment(&mut self, a: Vec3, b: Vec3, color: [f32; 4]);
    fn draw_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: [f32; 4]);
    fn draw_solid_triangle(&mut self, normal: Vec3, a: Vec3, b: Vec3, c: Vec3, color: [f32; 4]);
    fn draw_polygon(&mut self, vertices: &[Vec3], color: [f32; 4]);
    fn draw_solid_polygon(&mut self, normal: Vec3, vertices: &[Vec3], color: [f32; 4]);
    fn draw_circle(&mut self, normal: Vec3, center: Vec3, radius: f32, color: [f32; 4]);
    fn draw_sphere(&mut self, center: Vec3, radius: f32, color: [f32; 4]);
    fn draw_cylinder(&mut self, a: Vec3, b: Vec3, radius: f32, color: [f32; 4]);
    fn draw_capsule(&mut self, a: Vec3, b: Vec3, radius: f32, color: [f32; 4]);
    fn draw_aabb(&mut self, aabb: &Aabb, color: [f32; 4]);
    fn draw_transform(&mut self, xf: &Transform);
}

/// Draw-flag constants, combined by bitwise or.
pub mod draw_flags {
    pub const SHAPES: u32 = 1 << 0;
    pub const AABBS: u32 = 1 << 1;
    pub const CENTERS_OF_MASS: u32 = 1 << 2;
    pub const JOINTS: u32 = 1 << 3;
    pub const CONTACT_POINTS: u32 = 1 << 4;
    pub const CONTACT_NORMALS: u32 = 1 << 5;
}
