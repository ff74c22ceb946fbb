use arrayvec::ArrayVec;
use glam::Vec3;

use crate::config::MAX_MANIFOLD_POINTS;
use crate::core::transform::Transform;

/// Combinatorial witness of a contact point, used to match points across
/// frames for warm starting. `key_a`/`key_b` are shape-local feature ids
/// (face index, edge index, packed clip ids); `triangle` distinguishes
/// mesh faces so multi-triangle manifolds match consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureKey {
    pub key_a: u32,
    pub key_b: u32,
    pub triangle: u32,
}

impl FeatureKey {
    pub fn new(key_a: u32, key_b: u32) -> Self {
        Self {
            key_a,
            key_b,
            triangle: 0,
        }
    }
}

/// One persistent contact point in the local frames of both shapes.
#[derive(Debug, Clone, Copy)]
pub struct ManifoldPoint {
    /// Contact point on the surface of A, in A's frame.
    pub local_point_a: Vec3,
    /// Contact point on the surface of B, in B's frame.
    pub local_point_b: Vec3,
    pub key: FeatureKey,
    /// Cached impulses for warm starting.
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
    /// Number of consecutive frames this feature pair has persisted.
    pub persist_count: u32,
}

impl ManifoldPoint {
    pub fn new(local_point_a: Vec3, local_point_b: Vec3, key: FeatureKey) -> Self {
        Self {
            local_point_a,
            local_point_b,
            key,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            persist_count: 0,
        }
    }
}

/// Bounded set of contact points sharing one normal, produced by one
/// narrow-phase routine invocation.
#[derive(Debug, Clone, Default)]
pub struct Manifold {
    pub points: ArrayVec<ManifoldPoint, MAX_MANIFOLD_POINTS>,
    /// Contact normal in A's local frame, pointing from A to B.
    pub local_normal: Vec3,
}

impl Manifold {
    pub fn clear(&mut self) {
        self.points.clear();
        self.local_normal = Vec3::ZERO;
    }

    /// Copies cached impulses from a previous frame's manifold into
    /// matching points of this one, keyed by feature pair.
    pub fn warm_start_from(&mut self, old: &Manifold) {
        for point in self.points.iter_mut() {
            for old_point in old.points.iter() {
                if old_point.key == point.key {
                    point.normal_impulse = old_point.normal_impulse;
                    point.tangent_impulse = old_point.tangent_impulse;
                    point.persist_count = old_point.persist_count.saturating_add(1);
                    break;
                }
            }
        }
    }
}

/// Projection of a manifold to world space: one averaged normal, two
/// orthogonal tangents, and surface-offset contact points.
#[derive(Debug, Clone, Default)]
pub struct WorldManifold {
    pub normal: Vec3,
    pub tangent1: Vec3,
    pub tangent2: Vec3,
    pub points: ArrayVec<WorldManifoldPoint, MAX_MANIFOLD_POINTS>,
    pub center: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct WorldManifoldPoint {
    pub point: Vec3,
    /// Negative when the shapes penetrate.
    pub separation: f32,
}

impl WorldManifold {
    pub fn initialize(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut out = WorldManifold::default();
        if manifold.points.is_empty() {
            return out;
        }

        let normal = xf_a.transform_vector(manifold.local_normal).normalize_or_zero();
        out.normal = normal;
        let (t1, t2) = normal.any_orthonormal_pair();
        out.tangent1 = t1;
        out.tangent2 = t2;

        let mut center = Vec3::ZERO;
        for point in manifold.points.iter() {
            let c_a = xf_a.transform_point(point.local_point_a) + radius_a * normal;
            let c_b = xf_b.transform_point(point.local_point_b) - radius_b * normal;
            let world = 0.5 * (c_a + c_b);
            center += world;
            out.points.push(WorldManifoldPoint {
                point: world,
                separation: (c_b - c_a).dot(normal),
            });
        }
        out.center = center / manifold.points.len() as f32;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn world_projection_applies_radii() {
        let mut manifold = Manifold::default();
        manifold.local_normal = Vec3::Y;
        manifold.points.push(ManifoldPoint::new(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            FeatureKey::new(0, 0),
        ));

        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::from_position(Vec3::new(0.0, 2.1, 0.0));
        let wm = WorldManifold::initialize(&manifold, &xf_a, 0.1, &xf_b, 0.1);

        assert_relative_eq!(wm.normal.y, 1.0);
        // Surfaces: A at 1.0 + 0.1, B at 1.1 - 0.1: touching with slack 0.1.
        assert_relative_eq!(wm.points[0].separation, -0.1, epsilon = 1e-5);
    }

    #[test]
    fn warm_start_copies_matching_impulses() {
        let key = FeatureKey::new(3, 7);
        let mut old = Manifold::default();
        let mut p = ManifoldPoint::new(Vec3::ZERO, Vec3::ZERO, key);
        p.normal_impulse = 2.5;
        p.tangent_impulse = [0.5, -0.25];
        p.persist_count = 4;
        old.points.push(p);

        let mut new = Manifold::default();
        new.points
            .push(ManifoldPoint::new(Vec3::ONE, Vec3::ONE, key));
        new.points
            .push(ManifoldPoint::new(Vec3::ZERO, Vec3::ZERO, FeatureKey::new(9, 9)));
        new.warm_start_from(&old);

        assert_relative_eq!(new.points[0].normal_impulse, 2.5);
        assert_eq!(new.points[0].persist_count, 5);
        assert_relative_eq!(new.points[1].normal_impulse, 0.0);
    }
}
